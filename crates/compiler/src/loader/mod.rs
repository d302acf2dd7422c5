//! Safe rule card and manifest loading.
//!
//! YAML is parsed into plain data only (scalars, sequences, mappings). Tags
//! are stripped rather than interpreted, so a document carrying something
//! like `!!python/object/apply:os.system` loads as an ordinary sequence.

mod core;
mod result;
mod safe_yaml;


pub use self::core::{check_files, load_card, load_manifest, LoadedCard};
pub use self::result::{LoadResult, LoadStatus};
pub use self::safe_yaml::{parse_safe, strip_tags};
