mod trigger;

pub use trigger::TriggerRow;
