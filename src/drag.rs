use crate::ColumnPin;

/// What is being dragged. Tagged so that new draggable kinds cannot be confused with columns.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DragPayload {
    Column {
        column_id: String,
        pin: ColumnPin,
        depth: usize,
    },
}

impl DragPayload {
    pub fn column(column_id: impl Into<String>, pin: ColumnPin, depth: usize) -> Self {
        Self::Column {
            column_id: column_id.into(),
            pin,
            depth,
        }
    }

    pub fn column_id(&self) -> &str {
        match self {
            Self::Column { column_id, .. } => column_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DropTarget {
    pub payload: DragPayload,
    pub is_placeholder: bool,
}

impl DropTarget {
    pub fn new(payload: DragPayload, is_placeholder: bool) -> Self {
        Self {
            payload,
            is_placeholder,
        }
    }
}

/// A header can be picked up when its column is resizable, unpinned, and it is not a
/// placeholder cell.
pub fn can_drag(can_resize: bool, pin: ColumnPin, is_placeholder: bool) -> bool {
    can_resize && !pin.is_pinned() && !is_placeholder
}

/// A target accepts a payload of the same pin state and nesting depth.
pub fn accepts(source: &DragPayload, target: &DropTarget) -> bool {
    if target.is_placeholder {
        return false;
    }
    match (source, &target.payload) {
        (
            DragPayload::Column {
                pin: src_pin,
                depth: src_depth,
                ..
            },
            DragPayload::Column { pin, depth, .. },
        ) => src_pin == pin && src_depth == depth,
    }
}

/// Moves `dragged` to the position `target` occupies, splice style.
///
/// Indexes are read before the removal, so a forward drag lands after the target and a
/// backward drag lands before it. Returns `None` when either id is missing or both are the
/// same column.
pub fn reorder(order: &[String], dragged: &str, target: &str) -> Option<Vec<String>> {
    if dragged == target {
        return None;
    }
    let from = order.iter().position(|id| id == dragged)?;
    let to = order.iter().position(|id| id == target)?;
    let mut next = order.to_vec();
    let id = next.remove(from);
    let at = to.min(next.len());
    next.insert(at, id);
    Some(next)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragPayload),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropOutcome {
    /// The new column order.
    Dropped(Vec<String>),
    /// The target did not accept the payload; order unchanged.
    Rejected,
    /// Same column or unknown ids; order unchanged.
    Cancelled,
    NotDragging,
}

/// The `idle -> dragging -> (dropped | cancelled)` state machine behind header drag-and-drop.
#[derive(Clone, Debug, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    pub fn payload(&self) -> Option<&DragPayload> {
        match &self.state {
            DragState::Dragging(p) => Some(p),
            DragState::Idle => None,
        }
    }

    /// Returns `false` (and stays idle) when the source is not draggable.
    pub fn begin(&mut self, payload: DragPayload, draggable: bool) -> bool {
        if !draggable {
            gtrace!(column_id = payload.column_id(), "drag refused");
            return false;
        }
        gtrace!(column_id = payload.column_id(), "drag started");
        self.state = DragState::Dragging(payload);
        true
    }

    pub fn can_drop(&self, target: &DropTarget) -> bool {
        self.payload().is_some_and(|p| accepts(p, target))
    }

    /// Ends the drag over `target`. The controller is idle afterwards whatever the outcome.
    pub fn drop(&mut self, target: &DropTarget, order: &[String]) -> DropOutcome {
        let DragState::Dragging(payload) = core::mem::take(&mut self.state) else {
            return DropOutcome::NotDragging;
        };
        if !accepts(&payload, target) {
            gtrace!(
                column_id = payload.column_id(),
                target = target.payload.column_id(),
                "drop rejected"
            );
            return DropOutcome::Rejected;
        }
        match reorder(order, payload.column_id(), target.payload.column_id()) {
            Some(next) => {
                gtrace!(
                    column_id = payload.column_id(),
                    target = target.payload.column_id(),
                    "drop applied"
                );
                DropOutcome::Dropped(next)
            }
            None => DropOutcome::Cancelled,
        }
    }

    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }
}
