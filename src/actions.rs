use alloc::sync::Arc;

use crate::{GridError, Result};

pub const DEFAULT_ACTIONS_LABEL: &str = "Actions";

pub type RowPredicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;
pub type RowCallback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A boolean that is either fixed or computed from the row it is shown for.
pub enum Flag<T> {
    Value(bool),
    When(RowPredicate<T>),
}

impl<T> Flag<T> {
    pub fn when(f: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self::When(Arc::new(f))
    }

    pub fn eval(&self, row: &T) -> bool {
        match self {
            Self::Value(v) => *v,
            Self::When(f) => f(row),
        }
    }
}

impl<T> Default for Flag<T> {
    fn default() -> Self {
        Self::Value(false)
    }
}

impl<T> From<bool> for Flag<T> {
    fn from(v: bool) -> Self {
        Self::Value(v)
    }
}

impl<T> Clone for Flag<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Value(v) => Self::Value(*v),
            Self::When(f) => Self::When(Arc::clone(f)),
        }
    }
}

impl<T> core::fmt::Debug for Flag<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::When(_) => f.write_str("When(..)"),
        }
    }
}

/// One entry of a row's contextual menu.
pub struct RowAction<T> {
    pub label: Option<String>,
    pub is_divider: bool,
    pub on_click: Option<RowCallback<T>>,
    pub is_disabled: Flag<T>,
    pub is_hidden: Flag<T>,
    pub class_name: Option<String>,
}

impl<T> Default for RowAction<T> {
    fn default() -> Self {
        Self {
            label: None,
            is_divider: false,
            on_click: None,
            is_disabled: Flag::default(),
            is_hidden: Flag::default(),
            class_name: None,
        }
    }
}

impl<T> Clone for RowAction<T> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            is_divider: self.is_divider,
            on_click: self.on_click.clone(),
            is_disabled: self.is_disabled.clone(),
            is_hidden: self.is_hidden.clone(),
            class_name: self.class_name.clone(),
        }
    }
}

impl<T> RowAction<T> {
    pub fn item(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    pub fn divider() -> Self {
        Self {
            is_divider: true,
            ..Self::default()
        }
    }

    pub fn with_on_click(mut self, f: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_click = Some(Arc::new(f));
        self
    }

    pub fn with_disabled(mut self, disabled: impl Into<Flag<T>>) -> Self {
        self.is_disabled = disabled.into();
        self
    }

    pub fn disabled_when(mut self, f: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.is_disabled = Flag::when(f);
        self
    }

    pub fn with_hidden(mut self, hidden: impl Into<Flag<T>>) -> Self {
        self.is_hidden = hidden.into();
        self
    }

    pub fn hidden_when(mut self, f: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.is_hidden = Flag::when(f);
        self
    }

    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }
}

impl<T> core::fmt::Debug for RowAction<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RowAction")
            .field("label", &self.label)
            .field("is_divider", &self.is_divider)
            .field("is_disabled", &self.is_disabled)
            .field("is_hidden", &self.is_hidden)
            .field("class_name", &self.class_name)
            .finish_non_exhaustive()
    }
}

/// What the presentation layer draws for one menu line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MenuEntry {
    Label(String),
    Separator,
    Item {
        /// Position in the action list, passed back to [`ActionMenu::activate`].
        index: usize,
        label: String,
        disabled: bool,
        class_name: Option<String>,
    },
}

impl MenuEntry {
    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Item { disabled: false, .. })
    }
}

/// A validated action list shared by the dropdown in the actions column and the row's
/// right-click menu.
///
/// Predicates are evaluated on every call to [`Self::entries`] and [`Self::activate`].
pub struct ActionMenu<T> {
    label: String,
    actions: Vec<RowAction<T>>,
}

impl<T> ActionMenu<T> {
    /// Fails with [`GridError::MissingActionLabel`] when a non-divider action has no label.
    pub fn new(label: impl Into<String>, actions: Vec<RowAction<T>>) -> Result<Self> {
        for (index, action) in actions.iter().enumerate() {
            let labeled = action.label.as_deref().is_some_and(|l| !l.is_empty());
            if !action.is_divider && !labeled {
                return Err(GridError::MissingActionLabel { index });
            }
        }
        Ok(Self {
            label: label.into(),
            actions,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn actions(&self) -> &[RowAction<T>] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// The right-click trigger is inert when there is nothing to show.
    pub fn context_menu_enabled(&self) -> bool {
        !self.actions.is_empty()
    }

    pub fn for_each_entry(&self, row: &T, mut f: impl FnMut(MenuEntry)) {
        if !self.label.is_empty() {
            f(MenuEntry::Label(self.label.clone()));
            f(MenuEntry::Separator);
        }
        for (index, action) in self.actions.iter().enumerate() {
            if action.is_hidden.eval(row) {
                continue;
            }
            if action.is_divider {
                f(MenuEntry::Separator);
                continue;
            }
            f(MenuEntry::Item {
                index,
                label: action.label.clone().unwrap_or_default(),
                disabled: action.is_disabled.eval(row),
                class_name: action.class_name.clone(),
            });
        }
    }

    pub fn entries(&self, row: &T) -> Vec<MenuEntry> {
        let mut out = Vec::with_capacity(self.actions.len() + 2);
        self.for_each_entry(row, |e| out.push(e));
        out
    }

    /// Invokes the action's `on_click` with the row.
    ///
    /// Returns `false` (and does nothing) for dividers, hidden or disabled actions, and
    /// out-of-range indexes.
    pub fn activate(&self, index: usize, row: &T) -> bool {
        let Some(action) = self.actions.get(index) else {
            return false;
        };
        if action.is_divider || action.is_hidden.eval(row) || action.is_disabled.eval(row) {
            gtrace!(index, "ActionMenu::activate ignored");
            return false;
        }
        if let Some(on_click) = &action.on_click {
            on_click(row);
        }
        true
    }
}

impl<T> core::fmt::Debug for ActionMenu<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ActionMenu")
            .field("label", &self.label)
            .field("actions", &self.actions)
            .finish()
    }
}
