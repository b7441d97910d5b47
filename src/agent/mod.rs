mod bridge;
mod delivery;
mod error;
mod fix;
mod gate;
mod source;
mod supervisor;
mod worker;

pub use bridge::EventBridge;
pub use delivery::{DeliveryClient, DeliveryError, DeliveryRecord};
pub use error::AgentError;
pub use fix::{PositionFix, PositionUpdate};
pub use gate::DistanceGate;
pub use source::{AccuracyTier, LocationSource, PushSource, SourceError, SubscriptionRequest};
pub use supervisor::{AgentStatus, SessionMode, StartOutcome, TrackingParams, TrackingSupervisor};
