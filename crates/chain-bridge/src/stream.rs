use crate::sink::StreamId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    MainStreaming,
    /// Tokens go to the final answer stream. The main stream may still be
    /// open but receives nothing.
    FinalStreaming,
}

/// Where a token ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    Main(StreamId),
    Final(StreamId),
    Dropped,
}

/// Owns the handles of the in-progress main and final answer messages.
#[derive(Debug, Clone, Default)]
pub struct StreamController {
    main: Option<StreamId>,
    final_answer: Option<StreamId>,
    has_streamed_final_answer: bool,
}

impl StreamController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> StreamState {
        match (self.main, self.final_answer) {
            (_, Some(_)) => StreamState::FinalStreaming,
            (Some(_), None) => StreamState::MainStreaming,
            (None, None) => StreamState::Idle,
        }
    }

    pub fn main(&self) -> Option<StreamId> {
        self.main
    }

    pub fn final_answer(&self) -> Option<StreamId> {
        self.final_answer
    }

    pub fn open_main(&mut self) -> StreamId {
        let stream = StreamId::new();
        self.main = Some(stream);
        stream
    }

    pub fn open_final(&mut self) -> StreamId {
        let stream = StreamId::new();
        self.final_answer = Some(stream);
        stream
    }

    pub fn take_main(&mut self) -> Option<StreamId> {
        self.main.take()
    }

    pub fn take_final(&mut self) -> Option<StreamId> {
        self.final_answer.take()
    }

    /// Pick the handle the next token belongs to: the final answer stream
    /// when open, else the main stream.
    pub fn route(&mut self) -> Routed {
        let routed = match (self.final_answer, self.main) {
            (Some(stream), _) => Routed::Final(stream),
            (None, Some(stream)) => Routed::Main(stream),
            (None, None) => Routed::Dropped,
        };
        match routed {
            Routed::Final(_) => self.has_streamed_final_answer = true,
            Routed::Main(_) => self.has_streamed_final_answer = false,
            Routed::Dropped => {}
        }
        routed
    }

    pub fn has_streamed_final_answer(&self) -> bool {
        self.has_streamed_final_answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_controller_drops_tokens() {
        let mut controller = StreamController::new();
        assert_eq!(controller.state(), StreamState::Idle);
        assert_eq!(controller.route(), Routed::Dropped);
        assert!(!controller.has_streamed_final_answer());
    }

    #[test]
    fn final_stream_takes_precedence() {
        let mut controller = StreamController::new();
        let main = controller.open_main();
        assert_eq!(controller.route(), Routed::Main(main));
        assert_eq!(controller.state(), StreamState::MainStreaming);

        let final_answer = controller.open_final();
        assert_eq!(controller.state(), StreamState::FinalStreaming);
        assert_eq!(controller.route(), Routed::Final(final_answer));
        assert!(controller.has_streamed_final_answer());

        assert_eq!(controller.take_final(), Some(final_answer));
        assert_eq!(controller.route(), Routed::Main(main));
        assert!(!controller.has_streamed_final_answer());
    }

    #[test]
    fn taking_main_leaves_final_open() {
        let mut controller = StreamController::new();
        controller.open_main();
        let final_answer = controller.open_final();

        assert!(controller.take_main().is_some());
        assert_eq!(controller.final_answer(), Some(final_answer));
        assert_eq!(controller.state(), StreamState::FinalStreaming);
        assert_eq!(controller.take_main(), None);
    }
}
