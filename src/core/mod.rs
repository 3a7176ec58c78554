pub mod busy_gate;
pub mod coordinator;
pub mod frame_source;
pub mod poller;
pub mod view_state;
