pub mod poller;

pub use poller::{poll_until, PollOutcome, PollProfile};
