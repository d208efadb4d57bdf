// Domain models: autoscaling configs, alert payloads, decisions and gate state

mod alert;
mod autoscaling;
mod cooldown;
mod decision;
mod switch;

pub use alert::{Alert, AlertmanagerPayload};
pub use autoscaling::{
    AutoscalingConfig, AutoscalingConfigPatch, ConfigFilter, MonitoringSettings,
    NewAutoscalingConfig, ScalingSettings,
};
pub use cooldown::{CooldownStarted, CooldownStatus, CooldownWindow};
pub use decision::{DecisionReason, Direction, Outcome, ScaleDecision, SideEffect};
pub use switch::{HysteresisSwitchState, SwitchUpdate};
