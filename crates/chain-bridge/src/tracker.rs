/// Stack of the call frames that are currently running.
///
/// The innermost frame is the author of anything emitted right now and the
/// stack depth is its indentation. Push and pop are not paired by name: every
/// started frame must be popped exactly once, on success or on error.
#[derive(Debug, Clone)]
pub struct CallSequence {
    frames: Vec<String>,
    default_author: String,
}

impl CallSequence {
    pub fn new(default_author: impl Into<String>) -> Self {
        Self {
            frames: Vec::new(),
            default_author: default_author.into(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>) {
        self.frames.push(name.into());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.frames.pop()
    }

    pub fn current_author_and_depth(&self) -> (&str, usize) {
        match self.frames.last() {
            Some(author) => (author.as_str(), self.frames.len()),
            None => (self.default_author.as_str(), 0),
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[String] {
        &self.frames
    }
}
