mod list;
mod task;

pub use list::{List, ListChanges, NewList};
pub use task::{NewTask, Task, TaskChanges};
