use rand::Rng;

/// Nudges shown on the expanded banner.
pub const MOTIVATIONAL_MESSAGES: &[&str] = &[
    "Time is your most valuable resource",
    "Be mindful of where your time goes",
    "Is this how you want to spend this moment?",
    "Every minute counts toward your goals",
    "Maybe it's time for a change of activity",
    "Does this app bring you closer to your goals?",
    "Your attention is gold. Where are you putting it?",
    "This moment is a choice. Make it a conscious one",
    "Reminder: you are in charge of your time",
    "Small daily changes add up to big results",
];

/// Rotation through the message list.
///
/// `maybe_advance` moves forward with 1-in-10 odds per call so the message
/// lingers across several live ticks instead of churning every second.
#[derive(Debug, Default)]
pub struct MessageRotation {
    index: usize,
}

impl MessageRotation {
    pub fn current(&self) -> &'static str {
        MOTIVATIONAL_MESSAGES[self.index % MOTIVATIONAL_MESSAGES.len()]
    }

    pub fn maybe_advance<R: Rng>(&mut self, rng: &mut R) -> &'static str {
        if rng.gen_range(0..10) == 0 {
            self.index = (self.index + 1) % MOTIVATIONAL_MESSAGES.len();
        }
        self.current()
    }
}
