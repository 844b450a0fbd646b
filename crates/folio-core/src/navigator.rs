//! Previous/next stepping through a fixed context list.

/// Cursor over a snapshot of items opened in a detail view.
///
/// The context is captured when the navigator is opened, so later changes to
/// the list it came from do not move the cursor. Moves clamp at the ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailNavigator<T> {
    context: Vec<T>,
    index: Option<usize>,
}

impl<T> Default for DetailNavigator<T> {
    fn default() -> Self {
        Self {
            context: Vec::new(),
            index: None,
        }
    }
}

impl<T> DetailNavigator<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open on `context[index]`. Returns `false` and stays closed when
    /// `index` is out of range.
    pub fn open(&mut self, context: Vec<T>, index: usize) -> bool {
        if index >= context.len() {
            self.close();
            return false;
        }
        self.context = context;
        self.index = Some(index);
        true
    }

    pub fn close(&mut self) {
        self.context.clear();
        self.index = None;
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.index.is_some()
    }

    #[must_use]
    pub fn current(&self) -> Option<&T> {
        self.index.and_then(|index| self.context.get(index))
    }

    /// 1-based position of the current item.
    #[must_use]
    pub fn position(&self) -> Option<usize> {
        self.index.map(|index| index + 1)
    }

    /// Number of items in the context (0 when closed).
    #[must_use]
    pub fn total(&self) -> usize {
        self.context.len()
    }

    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.index.is_some_and(|index| index > 0)
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.index.is_some_and(|index| index + 1 < self.context.len())
    }

    /// Item before the current one, without moving.
    #[must_use]
    pub fn peek_previous(&self) -> Option<&T> {
        let index = self.index?;
        index.checked_sub(1).and_then(|i| self.context.get(i))
    }

    /// Item after the current one, without moving.
    #[must_use]
    pub fn peek_next(&self) -> Option<&T> {
        self.index.and_then(|index| self.context.get(index + 1))
    }

    /// Step forward. Returns `false` at the last item or when closed.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        if self.has_next() {
            self.index = self.index.map(|index| index + 1);
            true
        } else {
            false
        }
    }

    /// Step back. Returns `false` at the first item or when closed.
    pub fn previous(&mut self) -> bool {
        if self.has_previous() {
            self.index = self.index.map(|index| index - 1);
            true
        } else {
            false
        }
    }
}
