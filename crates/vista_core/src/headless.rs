//! In-memory simulation frames
//!
//! A plain component store implementing [`Frame`] and [`Game`] for hosts
//! that drive the view layer without an engine attached: test harnesses,
//! replays and dedicated tooling.

use crate::asset::{AssetGuid, AssetRef, ViewAsset};
use crate::entity::EntityRef;
use crate::frame::{
    Frame, FrameNumber, Frames, Game, GameId, MapEntityLink, MapInfo, SessionInfo, ViewLink,
};
use crate::transform::{Transform2D, Transform2DVertical, Transform3D};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Snapshot of one tick held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct HeadlessFrame {
    number: FrameNumber,
    verified: bool,
    map: MapInfo,
    transforms_2d: HashMap<EntityRef, Transform2D>,
    verticals: HashMap<EntityRef, Transform2DVertical>,
    transforms_3d: HashMap<EntityRef, Transform3D>,
    // ordered so that view creation is reproducible between runs
    views: BTreeMap<EntityRef, ViewLink>,
    map_links: BTreeMap<EntityRef, MapEntityLink>,
    assets: HashMap<AssetGuid, ViewAsset>,
    culled: HashSet<EntityRef>,
}

impl HeadlessFrame {
    pub fn new(number: FrameNumber) -> Self {
        Self {
            number,
            ..Default::default()
        }
    }

    pub fn verified(mut self) -> Self {
        self.verified = true;
        self
    }

    /// Copy of this frame advanced to `number` with the given verification state.
    pub fn next(&self, number: FrameNumber, verified: bool) -> Self {
        let mut frame = self.clone();
        frame.number = number;
        frame.verified = verified;
        frame
    }

    pub fn set_number(&mut self, number: FrameNumber) {
        self.number = number;
    }

    pub fn set_verified(&mut self, verified: bool) {
        self.verified = verified;
    }

    pub fn set_map(&mut self, map: MapInfo) {
        self.map = map;
    }

    pub fn register_asset(&mut self, asset: ViewAsset) {
        self.assets.insert(asset.guid, asset);
    }

    pub fn unregister_asset(&mut self, guid: AssetGuid) {
        self.assets.remove(&guid);
    }

    pub fn set_view(&mut self, entity: EntityRef, asset: AssetGuid) {
        self.views.insert(entity, ViewLink::new(asset));
    }

    pub fn remove_view(&mut self, entity: EntityRef) {
        self.views.remove(&entity);
    }

    pub fn set_map_entity(&mut self, entity: EntityRef, index: usize) {
        self.map_links.insert(entity, MapEntityLink { index });
    }

    pub fn set_transform_2d(&mut self, entity: EntityRef, transform: Transform2D) {
        self.transforms_2d.insert(entity, transform);
    }

    pub fn set_vertical(&mut self, entity: EntityRef, vertical: Transform2DVertical) {
        self.verticals.insert(entity, vertical);
    }

    pub fn set_transform_3d(&mut self, entity: EntityRef, transform: Transform3D) {
        self.transforms_3d.insert(entity, transform);
    }

    pub fn set_culled(&mut self, entity: EntityRef, culled: bool) {
        if culled {
            self.culled.insert(entity);
        } else {
            self.culled.remove(&entity);
        }
    }

    /// Remove every component of `entity`.
    pub fn destroy(&mut self, entity: EntityRef) {
        self.transforms_2d.remove(&entity);
        self.verticals.remove(&entity);
        self.transforms_3d.remove(&entity);
        self.views.remove(&entity);
        self.map_links.remove(&entity);
        self.culled.remove(&entity);
    }
}

impl Frame for HeadlessFrame {
    fn number(&self) -> FrameNumber {
        self.number
    }

    fn is_verified(&self) -> bool {
        self.verified
    }

    fn is_culled(&self, entity: EntityRef) -> bool {
        self.culled.contains(&entity)
    }

    fn transform_2d(&self, entity: EntityRef) -> Option<Transform2D> {
        self.transforms_2d.get(&entity).copied()
    }

    fn transform_2d_vertical(&self, entity: EntityRef) -> Option<Transform2DVertical> {
        self.verticals.get(&entity).copied()
    }

    fn transform_3d(&self, entity: EntityRef) -> Option<Transform3D> {
        self.transforms_3d.get(&entity).copied()
    }

    fn collect_views(&self, out: &mut Vec<(EntityRef, ViewLink)>) {
        out.extend(self.views.iter().map(|(&entity, &link)| (entity, link)));
    }

    fn collect_map_entity_links(&self, out: &mut Vec<(EntityRef, MapEntityLink)>) {
        out.extend(self.map_links.iter().map(|(&entity, &link)| (entity, link)));
    }

    fn map(&self) -> MapInfo {
        self.map
    }

    fn find_view_asset(&self, asset: AssetRef) -> Option<ViewAsset> {
        self.assets.get(&asset.id).cloned()
    }
}

/// Game session backed by headless frames.
pub struct HeadlessGame {
    id: GameId,
    pub verified: Option<HeadlessFrame>,
    pub predicted: Option<HeadlessFrame>,
    pub predicted_previous: Option<HeadlessFrame>,
    pub previous_update_predicted: Option<HeadlessFrame>,
    pub session: SessionInfo,
    pub interpolation_factor: f32,
}

impl HeadlessGame {
    pub fn new(id: u64) -> Self {
        Self {
            id: GameId(id),
            verified: None,
            predicted: None,
            predicted_previous: None,
            previous_update_predicted: None,
            session: SessionInfo::default(),
            interpolation_factor: 1.0,
        }
    }

    /// Use the same frame as verified, predicted and both history slots.
    /// This is what a local, non-predicted session exposes.
    pub fn with_lockstep_frame(mut self, frame: HeadlessFrame) -> Self {
        self.set_lockstep_frame(frame);
        self
    }

    pub fn set_lockstep_frame(&mut self, frame: HeadlessFrame) {
        self.verified = Some(frame.clone());
        self.predicted_previous = Some(frame.clone());
        self.previous_update_predicted = Some(frame.clone());
        self.predicted = Some(frame);
    }

    /// Publish the result of one simulation update.
    ///
    /// The old predicted frame becomes both the previous-update reference
    /// and the predicted-previous frame.
    pub fn push(&mut self, verified: HeadlessFrame, predicted: HeadlessFrame) {
        let old = self.predicted.take();
        self.previous_update_predicted = old.clone();
        self.predicted_previous = old;
        self.verified = Some(verified);
        self.predicted = Some(predicted);
    }
}

impl Game for HeadlessGame {
    fn id(&self) -> GameId {
        self.id
    }

    fn frames(&self) -> Frames<'_> {
        Frames {
            verified: self.verified.as_ref().map(|f| f as &dyn Frame),
            predicted: self.predicted.as_ref().map(|f| f as &dyn Frame),
            predicted_previous: self.predicted_previous.as_ref().map(|f| f as &dyn Frame),
            previous_update_predicted: self
                .previous_update_predicted
                .as_ref()
                .map(|f| f as &dyn Frame),
        }
    }

    fn session(&self) -> SessionInfo {
        self.session
    }

    fn interpolation_factor(&self) -> f32 {
        self.interpolation_factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn collects_views_in_entity_order() {
        let mut frame = HeadlessFrame::new(1);
        let a = EntityRef::new(2, 1);
        let b = EntityRef::new(1, 1);
        frame.set_view(a, AssetGuid::new(7));
        frame.set_view(b, AssetGuid::new(7));

        let mut out = Vec::new();
        frame.collect_views(&mut out);
        assert_eq!(out.iter().map(|(e, _)| *e).collect::<Vec<_>>(), vec![b, a]);
    }

    #[test]
    fn destroy_removes_every_component() {
        let mut frame = HeadlessFrame::new(1);
        let e = EntityRef::new(1, 1);
        frame.set_view(e, AssetGuid::new(1));
        frame.set_transform_2d(e, Transform2D::new(Vec2::ONE, 0.0));
        frame.destroy(e);
        assert!(!frame.has_transform_2d(e));
        let mut out = Vec::new();
        frame.collect_views(&mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn push_shifts_history() {
        let mut game = HeadlessGame::new(1).with_lockstep_frame(HeadlessFrame::new(1));
        game.push(HeadlessFrame::new(1).verified(), HeadlessFrame::new(3));
        let frames = game.frames();
        assert_eq!(frames.predicted.map(|f| f.number()), Some(3));
        assert_eq!(frames.predicted_previous.map(|f| f.number()), Some(1));
        assert_eq!(frames.previous_update_predicted.map(|f| f.number()), Some(1));
        assert_eq!(frames.verified.map(|f| f.is_verified()), Some(true));
    }

    #[test]
    fn map_info_accepts_source_map() {
        let map = MapInfo {
            guid: AssetGuid::new(9),
            source: Some(AssetGuid::new(4)),
        };
        assert!(map.is_based_on(AssetGuid::new(9)));
        assert!(map.is_based_on(AssetGuid::new(4)));
        assert!(!map.is_based_on(AssetGuid::new(5)));
    }
}
