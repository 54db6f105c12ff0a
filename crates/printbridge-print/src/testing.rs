// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test doubles shared by the unit tests of this crate.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::runner::{CommandOutput, CommandRunner, JobCommand};

/// Runner that replays canned outputs and records every command it sees.
///
/// Replies are consumed in order; once exhausted every further command
/// succeeds with empty output.
#[derive(Default)]
pub(crate) struct ScriptedRunner {
    replies: Mutex<VecDeque<std::io::Result<CommandOutput>>>,
    calls: Mutex<Vec<JobCommand>>,
}

impl ScriptedRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(self, output: CommandOutput) -> Self {
        self.replies.lock().expect("replies lock").push_back(Ok(output));
        self
    }

    pub(crate) fn fail_to_spawn(self, kind: std::io::ErrorKind) -> Self {
        self.replies
            .lock()
            .expect("replies lock")
            .push_back(Err(std::io::Error::from(kind)));
        self
    }

    pub(crate) fn calls(&self) -> Vec<JobCommand> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// Program names of the recorded calls, in order.
    pub(crate) fn programs(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|c| c.program().to_string_lossy().into_owned())
            .collect()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &JobCommand) -> std::io::Result<CommandOutput> {
        self.calls.lock().expect("calls lock").push(command.clone());
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| Ok(CommandOutput::ok("")))
    }
}
