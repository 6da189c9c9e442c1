/// Issues the positional keys of one encode or decode pass.
///
/// Keys are the decimal strings `"0"`, `"1"`, ... in order. Each pass owns its
/// dispenser; the two directions of a call never share one.
#[derive(Debug, Clone, Default)]
pub struct KeyDispenser {
    next: u32,
}

impl KeyDispenser {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    /// Returns the next free (or unread) key.
    pub fn dispense(&mut self) -> String {
        let key = self.next;
        self.next += 1;
        key.to_string()
    }

    /// Number of keys handed out so far.
    pub fn dispensed(&self) -> u32 {
        self.next
    }
}
