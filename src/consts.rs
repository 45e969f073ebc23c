//! Fixed constants shared across the storage and caching core.

/// Separator between `contract` and `variable` in a flat key.
pub const INDEX_SEPARATOR: char = '.';

/// Separator between `variable` and its subkeys, and between subkeys.
pub const DELIMITER: char = ':';

/// Group separator used inside the hierarchical file backend.
pub const HDF5_GROUP_SEPARATOR: char = '/';

/// Maximum number of subkeys (hash dimensions) a flat key may carry.
pub const MAX_HASH_DIMENSIONS: usize = 16;

/// Maximum encoded flat key length, in bytes.
pub const MAX_KEY_SIZE: usize = 1024;

/// Maximum size of a single stored attribute value, in bytes.
pub const ATTR_LEN_MAX: usize = 64_000;

/// Maximum length of a contract's filename on disk.
pub const FILENAME_LEN_MAX: usize = 255;

/// Default file-lock acquisition timeout, in seconds.
pub const DEFAULT_LOCK_TIMEOUT_SECONDS: u64 = 20;

/// Default block tag written alongside a value by the file backend.
pub const BLOCK_NUM_DEFAULT: i64 = -1;

/// Cost, in abstract units, charged per byte read.
pub const READ_COST_PER_BYTE: u64 = 1;

/// Cost, in abstract units, charged per byte written.
pub const WRITE_COST_PER_BYTE: u64 = 25;

/// Reserved variable name holding a contract's source code.
pub const CODE_KEY: &str = "__code__";

/// Reserved variable name holding a contract's compiled bytecode blob.
pub const COMPILED_KEY: &str = "__compiled__";

/// Reserved variable name holding a contract's owner principal.
pub const OWNER_KEY: &str = "__owner__";

/// Reserved variable name holding a contract's submission timestamp.
pub const TIME_KEY: &str = "__submitted__";

/// Reserved variable name holding a contract's developer principal.
pub const DEVELOPER_KEY: &str = "__developer__";

/// Prefix shared by all reserved (non-user) variable names.
pub const PRIVATE_METHOD_PREFIX: &str = "__";

/// Default top-level directory name for the file backend, joined onto
/// `<home>/.lamden` (spec.md §6's `<home>/.<app>/state` default).
pub const DEFAULT_STORAGE_DIRNAME: &str = "state";
