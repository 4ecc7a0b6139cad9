mod dynamic_var;
pub use dynamic_var::DynamicVar;

mod env_var;
pub use env_var::EnvVar;

mod guarded;
pub use guarded::Guarded;

mod options;
pub use options::{OptionPatch, OptionSetting, OptionTable, Options};

mod working_dir;
pub use working_dir::WorkingDir;
