use std::sync::Arc;

use {
    taskling_dialog::DialogController,
    taskling_tasks::{Dispatcher, TaskStore},
};

use crate::outbound::Outbound;

/// Runtime state shared by the polling loop and the handlers.
pub struct BotState {
    pub dialog: DialogController,
    pub dispatcher: Dispatcher,
    pub store: Arc<dyn TaskStore>,
    pub outbound: Outbound,
}
