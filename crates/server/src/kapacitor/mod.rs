mod client;
mod engine;
mod in_memory;
pub mod ticker;
mod wire;

pub use client::{Client, HttpConnector};
pub use engine::{
    task_id_from_href, EngineConnector, ProxyResponse, RemoteError, Task, TaskEngine,
    HTTP_ENDPOINT, TASKS_PATH,
};
pub use in_memory::{InMemoryEngine, InMemoryFleet};
pub use wire::{Dbrp, TaskForm, Var, RULE_VAR};
