/*
 * The build output buffer. `OutputLog` is owned by the controller thread and
 * is the only place the text is mutated. Any other thread (a background build
 * reporting progress, for instance) writes through an `OutputSink`, which
 * queues messages on a channel; the owner applies them, in order, when it
 * calls `drain`. Readers should drain first to see everything sent so far.
 */
use std::sync::mpsc::{self, Receiver, Sender};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMessage {
    Append(String),
    Clear,
}

// Cloneable, `Send` handle for writing to an `OutputLog` from any thread.
#[derive(Debug, Clone)]
pub struct OutputSink {
    sender: Sender<OutputMessage>,
}

impl OutputSink {
    // Returns false once the owning log has been dropped.
    pub fn append(&self, text: impl Into<String>) -> bool {
        self.sender.send(OutputMessage::Append(text.into())).is_ok()
    }

    pub fn clear(&self) -> bool {
        self.sender.send(OutputMessage::Clear).is_ok()
    }
}

pub struct OutputLog {
    text: String,
    sender: Sender<OutputMessage>,
    receiver: Receiver<OutputMessage>,
}

impl OutputLog {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        OutputLog {
            text: String::new(),
            sender,
            receiver,
        }
    }

    pub fn sink(&self) -> OutputSink {
        OutputSink {
            sender: self.sender.clone(),
        }
    }

    /*
     * Appends `text` as one entry terminated by a newline. `None` is ignored,
     * matching how the view treats a missing message.
     */
    pub fn append(&mut self, text: Option<&str>) {
        let Some(text) = text else {
            return;
        };
        self.text.push_str(text);
        self.text.push('\n');
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    // Applies every queued message in send order. Returns how many were applied.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(message) = self.receiver.try_recv() {
            match message {
                OutputMessage::Append(text) => self.append(Some(&text)),
                OutputMessage::Clear => self.clear(),
            }
            applied += 1;
        }
        if applied > 0 {
            log::trace!("OutputLog: Applied {applied} queued message(s).");
        }
        applied
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Default for OutputLog {
    fn default() -> Self {
        Self::new()
    }
}
