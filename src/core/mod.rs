mod access_controller;
mod checkpoint;
mod host;
pub mod managers;
mod mutation;
mod prepare_list;
mod replica;
pub mod role_state;
mod throttle;
mod types;
mod write_queue;

#[cfg(test)]
mod mutation_test;
#[cfg(test)]
mod replica_test;
#[cfg(test)]
mod throttle_test;

pub use access_controller::*;
pub use host::*;
pub use managers::*;
pub use mutation::*;
pub use prepare_list::*;
pub use replica::*;
pub use role_state::*;
pub use throttle::*;
pub use types::*;
pub use write_queue::*;
