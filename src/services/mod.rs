pub mod demux;
pub mod dispatcher;
pub mod mention;
pub mod suggestion;

pub use demux::{classify_fragment, encode_event, TurnEvent};
pub use dispatcher::{
    parse_directive, DirectiveAccumulator, Dispatcher, Step, TurnMachine, TurnPhase, TurnStream,
};
pub use mention::{augment_with_scene_hint, extract_mention, mention_candidates, resolve_mention};
pub use suggestion::{BackendSuggestionService, SuggestionService};
