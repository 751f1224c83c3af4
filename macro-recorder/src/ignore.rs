use tracing::debug;

/// Which transition of a key a suppression applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyTransition {
    Down,
    Up,
}

impl KeyTransition {
    pub fn from_pressed(pressed: bool) -> Self {
        if pressed {
            KeyTransition::Down
        } else {
            KeyTransition::Up
        }
    }
}

/// One armed suppression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IgnoreRule {
    pub vk: u16,
    pub transition: KeyTransition,
    /// Removed after its first match
    pub one_shot: bool,
}

impl IgnoreRule {
    pub fn once(vk: u16, transition: KeyTransition) -> Self {
        Self {
            vk,
            transition,
            one_shot: true,
        }
    }
}

/// Short-lived suppression set keeping the hot key that started a capture
/// out of the recorded sequence.
#[derive(Debug, Default)]
pub struct IgnoreKeys {
    rules: Vec<IgnoreRule>,
}

impl IgnoreKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any armed rules with `rules`.
    pub fn arm(&mut self, rules: impl IntoIterator<Item = IgnoreRule>) {
        self.rules = rules.into_iter().collect();
        debug!(rules = ?self.rules, "Ignore set armed");
    }

    pub fn clear(&mut self) {
        self.rules.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Check a key transition against the armed rules, consuming a matching one-shot rule.
    pub fn should_ignore(&mut self, vk: u16, pressed: bool) -> bool {
        let transition = KeyTransition::from_pressed(pressed);
        let Some(index) = self
            .rules
            .iter()
            .position(|rule| rule.vk == vk && rule.transition == transition)
        else {
            return false;
        };

        if self.rules[index].one_shot {
            let rule = self.rules.remove(index);
            debug!(?rule, "Ignore rule consumed");
        }
        true
    }
}
