use std::collections::VecDeque;

pub const DEFAULT_ANSWER_PREFIX_TOKENS: [&str; 3] = ["Final", "Answer", ":"];

/// Watches a token stream for the marker sequence that opens a final answer.
///
/// Keeps the last `markers.len()` tokens in a FIFO window, both raw and
/// whitespace-stripped, and compares it to the markers after every token.
/// Once matched, `reached` latches until [`FinalAnswerDetector::reset`].
#[derive(Debug, Clone)]
pub struct FinalAnswerDetector {
    markers: Vec<String>,
    markers_stripped: Vec<String>,
    window: VecDeque<String>,
    window_stripped: VecDeque<String>,
    strip: bool,
    reached: bool,
}

impl Default for FinalAnswerDetector {
    fn default() -> Self {
        Self::new(
            DEFAULT_ANSWER_PREFIX_TOKENS.iter().map(|token| token.to_string()),
            true,
        )
    }
}

impl FinalAnswerDetector {
    pub fn new<I, T>(markers: I, strip: bool) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let markers: Vec<String> = markers.into_iter().map(Into::into).collect();
        let markers_stripped = if strip {
            markers.iter().map(|token| token.trim().to_string()).collect()
        } else {
            markers.clone()
        };
        let len = markers.len();

        Self {
            markers,
            markers_stripped,
            window: seeded(len),
            window_stripped: seeded(len),
            strip,
            reached: false,
        }
    }

    /// Feed one token and report whether the final answer has been reached.
    pub fn observe(&mut self, token: &str) -> bool {
        if self.markers.is_empty() {
            return self.reached;
        }

        push_bounded(&mut self.window, token.to_string(), self.markers.len());
        push_bounded(
            &mut self.window_stripped,
            token.trim().to_string(),
            self.markers.len(),
        );

        if !self.reached && self.window_matches() {
            self.reached = true;
        }
        self.reached
    }

    fn window_matches(&self) -> bool {
        if self.strip {
            self.window_stripped.iter().eq(self.markers_stripped.iter())
        } else {
            self.window.iter().eq(self.markers.iter())
        }
    }

    pub fn is_reached(&self) -> bool {
        self.reached
    }

    pub fn reset(&mut self) {
        let len = self.markers.len();
        self.window = seeded(len);
        self.window_stripped = seeded(len);
        self.reached = false;
    }

    /// Raw tokens currently in the window, oldest first.
    pub fn window(&self) -> impl Iterator<Item = &str> {
        self.window.iter().map(String::as_str)
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }
}

fn seeded(len: usize) -> VecDeque<String> {
    std::iter::repeat_with(String::new).take(len).collect()
}

fn push_bounded(window: &mut VecDeque<String>, token: String, len: usize) {
    window.push_back(token);
    while window.len() > len {
        window.pop_front();
    }
}
