//! Configuration: settings file, environment overrides, and path helpers.

mod path;
mod settings;

pub use path::{
    SUPPORTED_IMAGE_EXTENSIONS, default_config_path, default_data_dir, expand_home,
    has_image_extension, home_dir, validate_image_path,
};
pub use settings::{
    ApiSettings, CropSettings, DEFAULT_API_BASE_URL, DEFAULT_LEDGER_CAPACITY, ENV_API_BASE_URL,
    ENV_DATA_DIR, ENV_TIMEOUT_SECS, HistorySettings, Settings, StorageSettings,
};
