mod pushover;

pub use pushover::PushoverNotifier;
