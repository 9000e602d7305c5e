pub mod config;
pub mod control;
pub mod forms;
pub mod record;
pub mod sensor;
pub mod settings;
pub mod storage;
pub mod text;
pub mod types;

pub use config::{ConfigurationRecord, RuntimeState};
pub use control::{decide_control, ControlEngine};
pub use forms::{AdminOutcome, FormFields, UpdateOutcome};
pub use record::{DecodeError, IntegrityTag};
pub use sensor::{PollThrottle, SensorInfo};
pub use settings::SettingsStore;
pub use storage::{BlockStore, MemoryStore, StoreError};
pub use types::{ControlMode, ControllerStatus, NetworkMode, OutletAction, TempUnit};
