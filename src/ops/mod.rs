pub mod calendar;
pub mod countdown;
pub mod reorder;
pub mod scheduler;
pub mod search;
pub mod task_ops;
pub mod task_timer;
