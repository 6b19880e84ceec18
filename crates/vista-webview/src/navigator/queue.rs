use std::collections::VecDeque;

use super::NavigationCommand;

/// FIFO buffer for commands issued while no engine instance is attached.
#[derive(Debug, Default)]
pub struct NavigationQueue {
    commands: VecDeque<NavigationCommand>,
}

impl NavigationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: NavigationCommand) {
        self.commands.push_back(command);
    }

    pub fn pop(&mut self) -> Option<NavigationCommand> {
        self.commands.pop_front()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Take every queued command, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = NavigationCommand> + '_ {
        self.commands.drain(..)
    }
}
