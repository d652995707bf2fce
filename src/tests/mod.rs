
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::ai::{AiError, CompletionClient, ImagePart};

enum Reply {
    Text(String),
    Fail,
}

/// Scripted model: a fixed reply or a fixed failure, with call capture.
pub struct StubClient {
    reply: Reply,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    image_mime: Mutex<Option<String>>,
}

impl StubClient {
    fn with(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(vec![]),
            image_mime: Mutex::new(None),
        })
    }

    pub fn replying(text: &str) -> Arc<Self> {
        Self::with(Reply::Text(text.to_string()))
    }

    pub fn failing() -> Arc<Self> {
        Self::with(Reply::Fail)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }

    pub fn last_image_mime(&self) -> Option<String> {
        self.image_mime.lock().unwrap().clone()
    }
}

impl CompletionClient for StubClient {
    fn complete(&self, prompt: &str, image: Option<ImagePart<'_>>) -> Result<String, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(image) = image {
            *self.image_mime.lock().unwrap() = Some(image.mime_type.to_string());
        }

        match &self.reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Fail => Err(AiError::Timeout(30)),
        }
    }

    fn model(&self) -> &str {
        "stub"
    }
}
