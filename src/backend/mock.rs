use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{BackendError, GenerativeBackend, GenerativeReply};

/// Scripted backend for tests: plays back a fixed sequence of replies
/// and failures, one per call, and counts how often it was invoked.
///
/// The call counter is atomic so shared references can prove how many
/// generative calls a pipeline actually made. Prompts are recorded so
/// tests can assert what each call was actually asked.
#[derive(Default)]
pub struct MockBackend {
    script: Vec<Result<String, BackendError>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a successful reply to the script.
    pub fn reply(mut self, text: &str) -> Self {
        self.script.push(Ok(text.to_string()));
        self
    }

    /// Append a failing call to the script.
    pub fn failure(mut self, error: BackendError) -> Self {
        self.script.push(Err(error));
        self
    }

    /// How many times `invoke` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The prompt passed to the call at `index`, if it happened.
    pub fn prompt_at(&self, index: usize) -> Option<String> {
        self.prompts.lock().ok()?.get(index).cloned()
    }
}

impl GenerativeBackend for MockBackend {
    fn invoke(
        &self,
        _system: &str,
        prompt: &str,
        _schema_hint: Option<&str>,
    ) -> Result<GenerativeReply, BackendError> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        match self.script.get(index) {
            Some(Ok(text)) => Ok(GenerativeReply { text: text.clone() }),
            Some(Err(error)) => Err(error.clone()),
            None => Err(BackendError::Transport(
                "scripted replies exhausted".to_string(),
            )),
        }
    }
}
