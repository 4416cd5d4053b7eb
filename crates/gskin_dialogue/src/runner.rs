//! Running a dialogue script

use gskin_core::{Channel, ConfigurationError, StateMachine, Step};
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::{Map, Value};

use crate::error::{DialogueError, Result};
use crate::expr::truthy;
use crate::script::{Action, Beat, Choice, Script, END};

/// Something the game has to present
#[derive(Clone, Debug, PartialEq)]
pub enum DialogueEvent {
    Speak { actor: String, line: String },
    /// Wait before the next beat, in seconds
    Pause(f64),
    StageDirection(Map<String, Value>),
    /// Show these options and answer with [`Dialogue::choose`]
    Prompt(Vec<Choice>),
}

struct PendingPrompt {
    beat: usize,
    /// Option indices within the beat, in the order they were shown
    shown: Vec<usize>,
    chosen: Option<String>,
}

/// A running dialogue
///
/// Nodes are the states of a [`StateMachine`] whose inputs are node names,
/// so every jump a script can make is validated when the dialogue is built.
/// The game drives it by calling [`advance`](Self::advance) until it
/// returns `None`.
pub struct Dialogue {
    script: Script,
    nodes: StateMachine<String, String>,
    position: usize,
    context: Map<String, Value>,
    seen: FxHashMap<(String, usize, usize), u64>,
    prompt: Option<PendingPrompt>,
}

impl Dialogue {
    /// Build a dialogue and enter the script's first node
    pub fn new(script: Script) -> Result<Self> {
        let mut builder = StateMachine::<String, String>::builder();
        for node in script.node_names() {
            builder = builder.state(node.to_string());
        }
        for node in script.node_names() {
            let mut linked = FxHashSet::default();
            for target in script.targets(node) {
                if !linked.insert(target) {
                    continue;
                }
                builder = if target == END {
                    builder.exit_on(node.to_string(), END.to_string())
                } else {
                    builder.on(node.to_string(), target.to_string(), target.to_string())
                };
            }
        }
        let nodes = builder.build()?;

        let mut dialogue = Self {
            script,
            nodes,
            position: 0,
            context: Map::new(),
            seen: FxHashMap::default(),
            prompt: None,
        };
        dialogue.restart()?;
        Ok(dialogue)
    }

    /// Parse and build in one go
    pub fn from_json(text: &str) -> Result<Self> {
        Self::new(Script::from_json(text)?)
    }

    /// Start with `context` instead of an empty one
    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = context;
        self
    }

    /// Go back to the first node, keeping the context and seen counts
    pub fn restart(&mut self) -> Result<()> {
        let first = self
            .script
            .first_node()
            .ok_or(ConfigurationError::NoStates)?
            .to_string();
        self.nodes.start(first)?;
        self.position = 0;
        self.prompt = None;
        Ok(())
    }

    /// Run beats until one needs presenting
    ///
    /// Returns `None` once the dialogue has finished. While a prompt is
    /// unanswered, each call shows it again.
    pub fn advance(&mut self) -> Result<Option<DialogueEvent>> {
        loop {
            let Some(node) = self.nodes.state().cloned() else {
                return Ok(None);
            };

            if let Some(prompt) = self.prompt.take() {
                match prompt.chosen {
                    Some(target) => self.jump(&node, &target)?,
                    None => {
                        if let Some(event) = self.show_prompt(&node, prompt.beat)? {
                            return Ok(Some(event));
                        }
                    }
                }
                continue;
            }

            let len = self.script.node(&node).map_or(0, <[Beat]>::len);
            if self.position >= len {
                tracing::debug!(node = %node, "dialogue ran off the end of a node");
                self.finish()?;
                return Ok(None);
            }

            let Some(index) = self.select_beat(&node)? else {
                continue;
            };
            if let Some(event) = self.execute(&node, index)? {
                return Ok(Some(event));
            }
        }
    }

    /// Answer the pending prompt with the `index`th shown option
    pub fn choose(&mut self, index: usize) -> Result<()> {
        let node = self.nodes.state().ok_or(DialogueError::NoPrompt)?;
        let prompt = self.prompt.as_mut().ok_or(DialogueError::NoPrompt)?;
        let option = *prompt
            .shown
            .get(index)
            .ok_or(DialogueError::ChoiceOutOfRange {
                index,
                shown: prompt.shown.len(),
            })?;

        let Some(Beat {
            action: Action::Options(choices),
            ..
        }) = self.script.node(node).and_then(|beats| beats.get(prompt.beat))
        else {
            return Err(DialogueError::NoPrompt);
        };
        let choice = choices.get(option).ok_or(DialogueError::NoPrompt)?;

        tracing::trace!(text = %choice.text, to = %choice.target, "chose option");
        prompt.chosen = Some(choice.target.clone());
        Ok(())
    }

    /// Pick the beat to run at the current position and move past it
    ///
    /// A run of conditional beats is one if/elif chain: the first whose
    /// condition holds runs and the rest are skipped.
    fn select_beat(&mut self, node: &str) -> Result<Option<usize>> {
        let beats = self.script.node(node).unwrap_or(&[]);
        let start = self.position;
        let Some(first) = beats.get(start) else {
            return Ok(None);
        };

        if first.condition.is_none() {
            self.position += 1;
            return Ok(Some(start));
        }

        let chain = beats[start..]
            .iter()
            .take_while(|beat| beat.condition.is_some())
            .count();
        self.position = start + chain;

        for (index, beat) in beats.iter().enumerate().skip(start).take(chain) {
            if let Some(condition) = &beat.condition {
                if condition.is_true(&self.context, &[])? {
                    return Ok(Some(index));
                }
            }
        }
        Ok(None)
    }

    fn execute(&mut self, node: &str, index: usize) -> Result<Option<DialogueEvent>> {
        let Some(beat) = self.script.node(node).and_then(|beats| beats.get(index)) else {
            return Ok(None);
        };

        match &beat.action {
            Action::Speak { actor, line } => Ok(Some(DialogueEvent::Speak {
                actor: actor.clone(),
                line: line.clone(),
            })),
            Action::Pause(seconds) => Ok(Some(DialogueEvent::Pause(*seconds))),
            Action::StageDirection(direction) => {
                Ok(Some(DialogueEvent::StageDirection(direction.clone())))
            }
            Action::UpdateContext(assignments) => {
                for (name, expr) in assignments {
                    let value = expr.eval(&self.context, &[])?;
                    self.context.insert(name.clone(), value);
                }
                Ok(None)
            }
            Action::NextNode(target) => {
                let target = target.clone();
                self.jump(node, &target)?;
                Ok(None)
            }
            Action::Options(_) => self.show_prompt(node, index),
        }
    }

    /// Evaluate the options of beat `beat` and show the visible ones
    ///
    /// A prompt with nothing to show is skipped.
    fn show_prompt(&mut self, node: &str, beat: usize) -> Result<Option<DialogueEvent>> {
        let Some(Beat {
            action: Action::Options(choices),
            ..
        }) = self.script.node(node).and_then(|beats| beats.get(beat))
        else {
            return Ok(None);
        };

        let mut shown = Vec::new();
        let mut visible = Vec::new();
        for (option, choice) in choices.iter().enumerate() {
            let seen = self
                .seen
                .get(&(node.to_string(), beat, option))
                .copied()
                .unwrap_or(0);
            let show = match &choice.condition {
                Some(condition) => {
                    truthy(&condition.eval(&self.context, &[("_seen", Value::from(seen))])?)
                }
                None => true,
            };
            if show {
                shown.push(option);
                visible.push(choice.clone());
            }
        }

        if shown.is_empty() {
            tracing::debug!(node = %node, beat, "skipping prompt with no visible options");
            return Ok(None);
        }

        for &option in &shown {
            *self.seen.entry((node.to_string(), beat, option)).or_default() += 1;
        }
        self.prompt = Some(PendingPrompt {
            beat,
            shown,
            chosen: None,
        });
        Ok(Some(DialogueEvent::Prompt(visible)))
    }

    fn jump(&mut self, node: &str, target: &str) -> Result<()> {
        self.prompt = None;
        match self.nodes.send(&target.to_string())? {
            Step::Transition { .. } | Step::Entered(_) => {
                self.position = 0;
                Ok(())
            }
            Step::Exited { .. } => Ok(()),
            Step::Ignored => Err(ConfigurationError::UnknownState {
                from: node.to_string(),
                to: target.to_string(),
            }
            .into()),
        }
    }

    fn finish(&mut self) -> Result<()> {
        self.prompt = None;
        self.nodes.stop()?;
        Ok(())
    }

    /// Stop the dialogue early
    pub fn end(&mut self) -> Result<()> {
        self.finish()
    }

    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.context
    }

    /// The node being played, `None` once finished
    pub fn current_node(&self) -> Option<&str> {
        self.nodes.state().map(String::as_str)
    }

    pub fn is_finished(&self) -> bool {
        !self.nodes.is_running()
    }

    /// Whether a prompt is waiting for [`choose`](Self::choose)
    pub fn awaiting_choice(&self) -> bool {
        self.prompt
            .as_ref()
            .is_some_and(|prompt| prompt.chosen.is_none())
    }

    /// Published with the node name whenever a node is entered
    pub fn node_entered(&mut self) -> &mut Channel<String> {
        self.nodes.entered()
    }

    /// Published with the node name whenever a node is left
    pub fn node_exited(&mut self) -> &mut Channel<String> {
        self.nodes.exited()
    }

    pub fn script(&self) -> &Script {
        &self.script
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    const GATE: &str = r#"{
        "gate": [
            {"update_context": {"visits": "visits + 1"}},
            {"Guard": "Halt!", "if": "visits == 1"},
            {"Guard": "You again.", "if": "visits == 2"},
            {"Guard": "Go away."},
            {"options": [
                {"text": "Let me pass", "value": "pass"},
                {"text": "Bribe", "value": "bribe", "if": "gold >= 10"},
                {"text": "Ask about the town", "value": "town", "if": "_seen == 0"},
                {"text": "Leave", "value": "end"}
            ]}
        ],
        "pass": [
            {"Guard": "No."},
            {"next_node": "gate"}
        ],
        "bribe": [
            {"update_context": {"gold": "gold - 10", "bribed": true}},
            {"stage_direction": {"guard": "pockets coins"}},
            {"pause": 0.5},
            {"Guard": "Go on."},
            {"next_node": "end"}
        ],
        "town": [
            {"Guard": "Quiet place."},
            {"next_node": "gate"}
        ]
    }"#;

    fn gate(gold: i64) -> Dialogue {
        let context = match json!({ "visits": 0, "gold": gold }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        Dialogue::from_json(GATE).unwrap().with_context(context)
    }

    fn speak(actor: &str, line: &str) -> Option<DialogueEvent> {
        Some(DialogueEvent::Speak {
            actor: actor.into(),
            line: line.into(),
        })
    }

    fn prompt_texts(event: Option<DialogueEvent>) -> Vec<String> {
        match event {
            Some(DialogueEvent::Prompt(choices)) => choices.into_iter().map(|c| c.text).collect(),
            other => panic!("expected a prompt, got {other:?}"),
        }
    }

    #[test]
    fn test_conditions_chain_as_if_elif() {
        let mut dialogue = gate(0);
        assert_eq!(dialogue.current_node(), Some("gate"));

        assert_eq!(dialogue.advance().unwrap(), speak("Guard", "Halt!"));
        assert_eq!(dialogue.advance().unwrap(), speak("Guard", "Go away."));
        assert_eq!(
            prompt_texts(dialogue.advance().unwrap()),
            vec!["Let me pass", "Ask about the town", "Leave"]
        );

        dialogue.choose(0).unwrap();
        assert_eq!(dialogue.advance().unwrap(), speak("Guard", "No."));
        assert_eq!(dialogue.advance().unwrap(), speak("Guard", "You again."));
        assert_eq!(dialogue.advance().unwrap(), speak("Guard", "Go away."));
    }

    #[test]
    fn test_seen_options_hide() {
        let mut dialogue = gate(0);
        dialogue.advance().unwrap();
        dialogue.advance().unwrap();
        dialogue.advance().unwrap();
        dialogue.choose(1).unwrap();

        assert_eq!(dialogue.advance().unwrap(), speak("Guard", "Quiet place."));
        assert_eq!(dialogue.advance().unwrap(), speak("Guard", "You again."));
        assert_eq!(dialogue.advance().unwrap(), speak("Guard", "Go away."));
        assert_eq!(
            prompt_texts(dialogue.advance().unwrap()),
            vec!["Let me pass", "Leave"]
        );
    }

    #[test]
    fn test_prompt_repeats_until_answered() {
        let mut dialogue = gate(0);
        dialogue.advance().unwrap();
        dialogue.advance().unwrap();

        let first = prompt_texts(dialogue.advance().unwrap());
        assert!(dialogue.awaiting_choice());
        let again = prompt_texts(dialogue.advance().unwrap());
        assert_eq!(first.len(), 3);
        // the town option has now been seen
        assert_eq!(again, vec!["Let me pass", "Leave"]);
    }

    #[test]
    fn test_bribe_updates_context_and_ends() {
        let mut dialogue = gate(25);
        dialogue.advance().unwrap();
        dialogue.advance().unwrap();
        assert_eq!(
            prompt_texts(dialogue.advance().unwrap()),
            vec!["Let me pass", "Bribe", "Ask about the town", "Leave"]
        );
        dialogue.choose(1).unwrap();

        assert_eq!(
            dialogue.advance().unwrap(),
            Some(DialogueEvent::StageDirection(
                match json!({"guard": "pockets coins"}) {
                    Value::Object(map) => map,
                    _ => unreachable!(),
                }
            ))
        );
        assert_eq!(dialogue.advance().unwrap(), Some(DialogueEvent::Pause(0.5)));
        assert_eq!(dialogue.advance().unwrap(), speak("Guard", "Go on."));
        assert_eq!(dialogue.advance().unwrap(), None);

        assert!(dialogue.is_finished());
        assert_eq!(dialogue.current_node(), None);
        assert_eq!(dialogue.context().get("gold"), Some(&json!(15)));
        assert_eq!(dialogue.context().get("bribed"), Some(&json!(true)));
        assert_eq!(dialogue.advance().unwrap(), None);
    }

    #[test]
    fn test_leave_option_ends() {
        let mut dialogue = gate(0);
        dialogue.advance().unwrap();
        dialogue.advance().unwrap();
        dialogue.advance().unwrap();
        dialogue.choose(2).unwrap();

        assert_eq!(dialogue.advance().unwrap(), None);
        assert!(dialogue.is_finished());
    }

    #[test]
    fn test_choose_errors() {
        let mut dialogue = gate(0);
        assert!(matches!(dialogue.choose(0), Err(DialogueError::NoPrompt)));

        dialogue.advance().unwrap();
        dialogue.advance().unwrap();
        dialogue.advance().unwrap();
        assert!(matches!(
            dialogue.choose(3),
            Err(DialogueError::ChoiceOutOfRange { index: 3, shown: 3 })
        ));
    }

    #[test]
    fn test_node_events() {
        let mut dialogue = gate(0);
        let entered = Arc::new(Mutex::new(Vec::new()));
        let sink = entered.clone();
        dialogue.node_entered().subscribe(move |node: &String| {
            sink.lock().unwrap().push(node.clone());
        });

        dialogue.advance().unwrap();
        dialogue.advance().unwrap();
        dialogue.advance().unwrap();
        dialogue.choose(0).unwrap();
        dialogue.advance().unwrap();
        dialogue.advance().unwrap();

        assert_eq!(*entered.lock().unwrap(), vec!["pass", "gate"]);
    }

    #[test]
    fn test_unknown_target_rejected_at_load() {
        let result = Dialogue::from_json(r#"{"a": [{"next_node": "nowhere"}]}"#);
        assert!(matches!(
            result,
            Err(DialogueError::Configuration(ConfigurationError::UnknownState { .. }))
        ));
        assert!(matches!(
            Dialogue::from_json("{}"),
            Err(DialogueError::Configuration(ConfigurationError::NoStates))
        ));
    }

    #[test]
    fn test_running_off_the_end_finishes() {
        let mut dialogue = Dialogue::from_json(r#"{"only": [{"A": "one"}]}"#).unwrap();
        assert_eq!(dialogue.advance().unwrap(), speak("A", "one"));
        assert_eq!(dialogue.advance().unwrap(), None);
        assert!(dialogue.is_finished());

        dialogue.restart().unwrap();
        assert_eq!(dialogue.current_node(), Some("only"));
        assert_eq!(dialogue.advance().unwrap(), speak("A", "one"));
    }

    #[test]
    fn test_empty_prompt_is_skipped() {
        let mut dialogue = Dialogue::from_json(
            r#"{"n": [
                {"options": [{"text": "hidden", "value": "end", "if": "false"}]},
                {"A": "after"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(dialogue.advance().unwrap(), speak("A", "after"));
    }
}
