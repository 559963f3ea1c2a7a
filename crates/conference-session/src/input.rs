//! Input Routing
//!
//! Clicks and long presses are hit-tested against the view, checked against
//! the entity's interaction capabilities, and open a pie menu. A slice can be
//! selected once the menu has finished opening; selecting closes the menu and
//! yields the action request to perform.
//!
//! Live play and playback drive the same router, so a replayed action goes
//! through the same hit test and menu as the recorded one.

use session_events::{ActionName, ActionRequest, BiographyField, ModelSnapshot, PartId};

use crate::layout::Point;
use crate::view::{ConferenceView, MenuKind};

/// One selectable entry of a pie menu.
#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub label: String,
    pub request: ActionRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieMenu {
    pub kind: MenuKind,
    pub anchor: Point,
    pub slices: Vec<PieSlice>,
    /// 0 when just opened, 1 when fully open
    pub open_progress: f64,
}

impl PieMenu {
    pub fn new(kind: MenuKind, anchor: Point, snapshot: &ModelSnapshot) -> Self {
        let slices = match &kind {
            MenuKind::Part(id) => part_slices(id, snapshot),
            MenuKind::RayField(id) => field_slices(id),
        };
        Self {
            kind,
            anchor,
            slices,
            open_progress: 0.0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open_progress >= 1.0
    }

    pub fn slice_for(&self, request: &ActionRequest) -> Option<&PieSlice> {
        self.slices.iter().find(|s| &s.request == request)
    }
}

fn slice(label: impl Into<String>, request: ActionRequest) -> PieSlice {
    PieSlice {
        label: label.into(),
        request,
    }
}

fn part_slices(id: &PartId, snapshot: &ModelSnapshot) -> Vec<PieSlice> {
    let mut slices = vec![
        slice("Notice", ActionRequest::new(ActionName::NoticePart, id.clone())),
        slice("Feel toward", ActionRequest::new(ActionName::FeelToward, id.clone())),
        slice("Blend", ActionRequest::new(ActionName::Blend, id.clone())),
        slice("Step back", ActionRequest::new(ActionName::DismissPart, id.clone())),
        slice("Unburden", ActionRequest::new(ActionName::Unburden, id.clone())),
        slice(
            "Let it take over",
            ActionRequest::new(ActionName::SpontaneousBlend, id.clone()),
        ),
    ];
    for target in snapshot.targets.iter().filter(|t| *t != id) {
        slices.push(slice(
            format!("Invite to {}", target),
            ActionRequest::new(ActionName::InvitePart, id.clone()).with_target(target.clone()),
        ));
    }
    slices
}

fn field_slices(id: &PartId) -> Vec<PieSlice> {
    BiographyField::ALL
        .iter()
        .map(|field| {
            slice(
                field.as_str().replace('_', " "),
                ActionRequest::new(ActionName::RayFieldSelect, id.clone()).with_field(*field),
            )
        })
        .collect()
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InputError {
    #[error("nothing clickable at ({x:.1}, {y:.1})")]
    NothingHit { x: f32, y: f32 },
    #[error("part {0} does not respond to this gesture")]
    NoCapability(PartId),
    #[error("no menu is open")]
    NoMenu,
    #[error("menu is still opening")]
    MenuNotOpen,
    #[error("menu has no slice for {0}")]
    SliceMissing(ActionRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gesture {
    Click,
    LongPress,
}

/// Tracks the pie menu currently shown, if any.
#[derive(Debug, Default)]
pub struct InputRouter {
    menu: Option<PieMenu>,
}

impl InputRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn menu(&self) -> Option<&PieMenu> {
        self.menu.as_ref()
    }

    /// True once a menu has finished opening.
    pub fn is_open(&self) -> bool {
        self.menu.as_ref().is_some_and(PieMenu::is_open)
    }

    pub fn click(
        &mut self,
        view: &ConferenceView,
        snapshot: &ModelSnapshot,
        point: Point,
    ) -> Result<&PieMenu, InputError> {
        self.gesture(view, snapshot, point, Gesture::Click)
    }

    pub fn long_press(
        &mut self,
        view: &ConferenceView,
        snapshot: &ModelSnapshot,
        point: Point,
    ) -> Result<&PieMenu, InputError> {
        self.gesture(view, snapshot, point, Gesture::LongPress)
    }

    fn gesture(
        &mut self,
        view: &ConferenceView,
        snapshot: &ModelSnapshot,
        point: Point,
        gesture: Gesture,
    ) -> Result<&PieMenu, InputError> {
        let id = view.hit_test(point).ok_or(InputError::NothingHit {
            x: point.x,
            y: point.y,
        })?;
        let kind = view
            .capabilities(&id)
            .and_then(|caps| match gesture {
                Gesture::Click => caps.click.clone(),
                Gesture::LongPress => caps.long_press.clone(),
            })
            .ok_or_else(|| InputError::NoCapability(id.clone()))?;
        tracing::debug!(part = %id, ?gesture, "opening menu");
        Ok(self.open_direct(kind, point, snapshot))
    }

    /// Opens a menu without a hit test, replacing any open one.
    pub fn open_direct(
        &mut self,
        kind: MenuKind,
        anchor: Point,
        snapshot: &ModelSnapshot,
    ) -> &PieMenu {
        self.menu.insert(PieMenu::new(kind, anchor, snapshot))
    }

    /// Advances the opening animation of the current menu.
    pub fn advance(&mut self, dt: f64, open_duration: f64) {
        if let Some(menu) = self.menu.as_mut() {
            menu.open_progress = if open_duration <= 0.0 {
                1.0
            } else {
                (menu.open_progress + dt / open_duration).min(1.0)
            };
        }
    }

    /// Selects the slice carrying `request` and closes the menu.
    pub fn select_request(&mut self, request: &ActionRequest) -> Result<ActionRequest, InputError> {
        let menu = self.menu.as_ref().ok_or(InputError::NoMenu)?;
        if !menu.is_open() {
            return Err(InputError::MenuNotOpen);
        }
        let chosen = menu
            .slice_for(request)
            .map(|s| s.request.clone())
            .ok_or_else(|| InputError::SliceMissing(request.clone()))?;
        self.menu = None;
        Ok(chosen)
    }

    pub fn select_slice(&mut self, index: usize) -> Result<ActionRequest, InputError> {
        let menu = self.menu.as_ref().ok_or(InputError::NoMenu)?;
        if !menu.is_open() {
            return Err(InputError::MenuNotOpen);
        }
        let chosen = menu
            .slices
            .get(index)
            .map(|s| s.request.clone())
            .ok_or(InputError::NoMenu)?;
        self.menu = None;
        Ok(chosen)
    }

    pub fn cancel(&mut self) {
        self.menu = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LayoutConfig, ViewConfig};
    use crate::layout::SeatRing;

    fn pid(id: &str) -> PartId {
        PartId::new(id)
    }

    fn seated() -> (ConferenceView, ModelSnapshot) {
        let snapshot = ModelSnapshot {
            parts: vec![pid("critic"), pid("planner")],
            targets: vec![pid("critic")],
            self_ray: Some(pid("critic")),
            ..Default::default()
        };
        let mut view =
            ConferenceView::new(ViewConfig::default(), SeatRing::new(LayoutConfig::default()));
        view.sync(&snapshot);
        view.settle_step(0.0);
        (view, snapshot)
    }

    #[test]
    fn test_click_opens_part_menu() {
        let (view, snapshot) = seated();
        let mut input = InputRouter::new();
        let at = view.position(&pid("planner")).unwrap();

        let menu = input.click(&view, &snapshot, at).unwrap();
        assert_eq!(menu.kind, MenuKind::Part(pid("planner")));
        let invite = ActionRequest::new(ActionName::InvitePart, "planner").with_target("critic");
        assert!(menu.slice_for(&invite).is_some());
    }

    #[test]
    fn test_long_press_needs_self_ray() {
        let (view, mut snapshot) = seated();
        let mut input = InputRouter::new();
        let at = view.position(&pid("critic")).unwrap();

        let menu = input.long_press(&view, &snapshot, at).unwrap();
        assert_eq!(menu.kind, MenuKind::RayField(pid("critic")));
        assert_eq!(menu.slices.len(), BiographyField::ALL.len());

        let planner = view.position(&pid("planner")).unwrap();
        snapshot.self_ray = None;
        assert_eq!(
            input.long_press(&view, &snapshot, planner).unwrap_err(),
            InputError::NoCapability(pid("planner"))
        );
    }

    #[test]
    fn test_select_waits_for_menu() {
        let (view, snapshot) = seated();
        let mut input = InputRouter::new();
        let at = view.position(&pid("critic")).unwrap();
        input.click(&view, &snapshot, at).unwrap();

        let notice = ActionRequest::new(ActionName::NoticePart, "critic");
        assert_eq!(input.select_request(&notice), Err(InputError::MenuNotOpen));

        input.advance(0.1, 0.25);
        assert!(!input.is_open());
        input.advance(0.2, 0.25);
        assert!(input.is_open());
        assert_eq!(input.select_request(&notice), Ok(notice.clone()));
        assert!(input.menu().is_none());
        assert_eq!(input.select_request(&notice), Err(InputError::NoMenu));
    }

    #[test]
    fn test_missing_slice() {
        let (view, snapshot) = seated();
        let mut input = InputRouter::new();
        input.open_direct(MenuKind::Part(pid("critic")), view.center(), &snapshot);
        input.advance(1.0, 0.25);

        let invite_self = ActionRequest::new(ActionName::InvitePart, "critic").with_target("critic");
        assert!(matches!(
            input.select_request(&invite_self),
            Err(InputError::SliceMissing(_))
        ));
        assert!(input.menu().is_some());
    }

    #[test]
    fn test_click_on_empty_space() {
        let (view, snapshot) = seated();
        let mut input = InputRouter::new();
        assert!(matches!(
            input.click(&view, &snapshot, view.center()),
            Err(InputError::NothingHit { .. })
        ));
    }
}
