pub mod notifier;
pub mod policy;
pub mod slots;
