pub mod field;
pub mod live;
pub mod registry;
pub mod value;
pub mod version;

pub use field::{internal_types, Choice, FieldDescriptor, FieldKind};
pub use live::{LiveObject, RelatedItem};
pub use registry::{ModelMeta, ModelRegistry, Registration};
pub use value::{coerce_pk, display_value, FieldValue, PkType};
pub use version::{ObjectRef, Revision, RevisionId, Version, VersionId, FORMAT_JSON};
