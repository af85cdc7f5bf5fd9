//! Resolving canvas points to annotation targets.
//!
//! Hit-testing works in screen space so the grab radius is constant in
//! display pixels regardless of the fit ratio. Only rectangles are
//! interactive: polygons have neither resize handles nor a selectable body.

use crate::constants::HANDLE_HIT_RADIUS;
use crate::model::{Annotation, AnnotationId, Point, ResizeHandle};
use crate::view_math::ViewTransform;

/// A resize handle under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleHit {
    pub annotation_id: AnnotationId,
    pub handle: ResizeHandle,
}

/// What a pointer-down landed on, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Handle(HandleHit),
    Body(AnnotationId),
    Empty,
}

/// Screen-space positions of the eight handles of a rectangle.
pub fn handle_positions(annotation: &Annotation, transform: &ViewTransform) -> Option<[(ResizeHandle, Point); 8]> {
    let (min, max) = annotation.diagonal()?;
    let min = transform.to_screen(min);
    let max = transform.to_screen(max);
    Some(ResizeHandle::ALL.map(|h| (h, h.position(min, max))))
}

/// Find the first rectangle handle within the grab radius of `screen`.
///
/// Annotations are scanned in list order and the first match wins, so when
/// handles of two rectangles overlap the older rectangle gets the drag.
pub fn find_handle(
    screen: Point,
    annotations: &[Annotation],
    transform: &ViewTransform,
) -> Option<HandleHit> {
    annotations.iter().find_map(|ann| {
        let handles = handle_positions(ann, transform)?;
        handles
            .iter()
            .find(|(_, pos)| pos.distance_to(&screen) <= HANDLE_HIT_RADIUS)
            .map(|(handle, _)| HandleHit {
                annotation_id: ann.id,
                handle: *handle,
            })
    })
}

/// Find the first rectangle whose screen-space bounds contain `screen`.
pub fn find_annotation_body(
    screen: Point,
    annotations: &[Annotation],
    transform: &ViewTransform,
) -> Option<AnnotationId> {
    annotations
        .iter()
        .filter_map(|ann| ann.diagonal().map(|d| (ann.id, d)))
        .find(|(_, (min, max))| {
            let min = transform.to_screen(*min);
            let max = transform.to_screen(*max);
            screen.x >= min.x && screen.x <= max.x && screen.y >= min.y && screen.y <= max.y
        })
        .map(|(id, _)| id)
}

/// Resolve a pointer-down: handles first, then bodies, then empty space.
pub fn resolve(screen: Point, annotations: &[Annotation], transform: &ViewTransform) -> HitTarget {
    if let Some(hit) = find_handle(screen, annotations, transform) {
        return HitTarget::Handle(hit);
    }
    match find_annotation_body(screen, annotations, transform) {
        Some(id) => HitTarget::Body(id),
        None => HitTarget::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(id: AnnotationId, x1: f32, y1: f32, x2: f32, y2: f32) -> Annotation {
        Annotation::rectangle(id, "car", Point::new(x1, y1), Point::new(x2, y2))
    }

    fn triangle(id: AnnotationId) -> Annotation {
        Annotation::polygon(
            id,
            "tree",
            vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0), Point::new(50.0, 100.0)],
        )
    }

    #[test]
    fn test_handle_beats_body() {
        let anns = vec![square(1, 0.0, 0.0, 100.0, 100.0)];
        let t = ViewTransform::identity();
        for (dx, dy) in [(0.0, 0.0), (-8.0, 0.0), (0.0, -8.0), (-5.0, -5.0), (3.0, 4.0)] {
            let p = Point::new(100.0 + dx, 100.0 + dy);
            assert_eq!(
                resolve(p, &anns, &t),
                HitTarget::Handle(HandleHit {
                    annotation_id: 1,
                    handle: ResizeHandle::Se
                }),
                "at {:?}",
                p
            );
        }
    }

    #[test]
    fn test_handle_radius_is_inclusive_and_bounded() {
        let anns = vec![square(1, 0.0, 0.0, 100.0, 100.0)];
        let t = ViewTransform::identity();
        assert!(find_handle(Point::new(50.0, -8.0), &anns, &t).is_some());
        assert!(find_handle(Point::new(50.0, -8.5), &anns, &t).is_none());
        assert_eq!(
            find_handle(Point::new(50.0, 0.0), &anns, &t).map(|h| h.handle),
            Some(ResizeHandle::N)
        );
        assert_eq!(
            find_handle(Point::new(0.0, 50.0), &anns, &t).map(|h| h.handle),
            Some(ResizeHandle::W)
        );
    }

    #[test]
    fn test_radius_is_screen_space() {
        // At ratio 4 the same 8px radius covers only 2 image pixels
        let anns = vec![square(1, 0.0, 0.0, 100.0, 100.0)];
        let t = ViewTransform::new(4.0, 10.0, 10.0).unwrap();
        let corner = t.to_screen(Point::new(100.0, 100.0));
        assert!(find_handle(Point::new(corner.x + 7.0, corner.y), &anns, &t).is_some());
        assert!(find_handle(Point::new(corner.x + 9.0, corner.y), &anns, &t).is_none());
    }

    #[test]
    fn test_body_hit_and_empty() {
        let anns = vec![square(1, 0.0, 0.0, 100.0, 100.0)];
        let t = ViewTransform::identity();
        assert_eq!(resolve(Point::new(50.0, 30.0), &anns, &t), HitTarget::Body(1));
        assert_eq!(resolve(Point::new(150.0, 30.0), &anns, &t), HitTarget::Empty);
    }

    #[test]
    fn test_overlap_favors_list_order() {
        let anns = vec![square(1, 0.0, 0.0, 100.0, 100.0), square(2, 50.0, 50.0, 150.0, 150.0)];
        let t = ViewTransform::identity();
        assert_eq!(find_annotation_body(Point::new(75.0, 75.0), &anns, &t), Some(1));
        // Rectangle 2's nw handle sits inside rectangle 1 but handles win over bodies
        assert_eq!(
            find_handle(Point::new(50.0, 50.0), &anns, &t),
            Some(HandleHit {
                annotation_id: 2,
                handle: ResizeHandle::Nw
            })
        );
    }

    #[test]
    fn test_polygons_are_not_interactive() {
        let anns = vec![triangle(1)];
        let t = ViewTransform::identity();
        assert_eq!(resolve(Point::new(0.0, 0.0), &anns, &t), HitTarget::Empty);
        assert_eq!(resolve(Point::new(50.0, 30.0), &anns, &t), HitTarget::Empty);
    }
}
