#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use futures::executor::LocalPool;

    use crate::*;

    fn counter_frames() -> Vec<Frame> {
        vec![
            Frame::element("p", 2),
            Frame::text("Current count: 0"),
            Frame::element("button", 3),
            Frame::handler("onclick", EventHandlerId(1)),
            Frame::text("Click me"),
        ]
    }

    #[test]
    fn test_validate_well_formed_frames() {
        assert_eq!(validate_frames(&counter_frames()), Ok(()));
    }

    #[test]
    fn test_validate_rejects_subtree_overrun() {
        let frames = vec![Frame::element("div", 3), Frame::text("x")];
        assert!(matches!(
            validate_frames(&frames),
            Err(FrameError::SubtreeOverrun { index: 0, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_attribute_after_content() {
        let frames = vec![
            Frame::element("div", 3),
            Frame::text("x"),
            Frame::attribute("id", "late"),
        ];
        assert!(matches!(
            validate_frames(&frames),
            Err(FrameError::UnexpectedFrame { index: 2, kind: "Attribute", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_length() {
        let frames = vec![Frame::Region { subtree_length: 0 }];
        assert_eq!(
            validate_frames(&frames),
            Err(FrameError::ZeroSubtreeLength { index: 0 })
        );
    }

    #[test]
    fn test_attribute_run_stops_at_content() {
        let frames = vec![
            Frame::element("input", 4),
            Frame::attribute("type", "text"),
            Frame::ReferenceCapture { capture_id: "r1".into() },
            Frame::attribute("disabled", true),
        ];
        assert_eq!(attribute_run(&frames, 0), 1..4);

        let frames = counter_frames();
        assert_eq!(attribute_run(&frames, 2), 3..4);
        assert_eq!(attribute_run(&frames, 0), 1..1);
    }

    #[test]
    fn test_logical_children_flatten_regions() {
        let frames = vec![
            Frame::text("a"),
            Frame::Region { subtree_length: 3 },
            Frame::text("b"),
            Frame::component(ComponentId(7)),
            Frame::element("div", 2),
            Frame::attribute("id", "d"),
        ];
        assert_eq!(logical_children(&frames, 0..frames.len()), vec![0, 2, 3, 4]);
        // Attributes of the div are not children of it.
        assert!(logical_children(&frames, 5..6).is_empty());
    }

    #[test]
    fn test_batch_json_roundtrip_keeps_edits() {
        let mut batch = RenderBatch::new();
        let idx = batch.add_reference_frames(&counter_frames());
        batch.updated_components.push(ComponentDiff {
            component_id: ComponentId(1),
            edits: vec![
                RenderTreeEdit::PrependFrame { sibling_index: 0, reference_frame_index: idx },
                RenderTreeEdit::StepIn { sibling_index: 0 },
                RenderTreeEdit::RemoveAttribute { sibling_index: 0, name: "onclick".into() },
                RenderTreeEdit::StepOut,
            ],
        });
        batch.disposed_event_handler_ids.push(EventHandlerId(9));

        let json = batch.to_json().unwrap();
        assert!(json.contains("\"op\": \"prepend_frame\""));
        let restored = RenderBatch::from_json(&json).unwrap();
        assert_eq!(restored, batch);
        assert_eq!(restored.edit_count(), 4);
    }

    #[test]
    fn test_event_args_from_json() {
        let args: EventArgs =
            serde_json::from_str(r#"{"type":"change","args":{"value":"b"}}"#).unwrap();
        assert_eq!(args, EventArgs::change("b"));
        let args: EventArgs = serde_json::from_str(r#"{"type":"mouse","args":{"detail":2}}"#).unwrap();
        assert!(matches!(args, EventArgs::Mouse(MouseEventArgs { detail: 2, .. })));
    }

    #[test]
    fn test_event_completion_states() {
        let mut done = EventCompletion::completed();
        assert!(done.is_complete());

        let (mut pending, sender) = EventCompletion::pending();
        assert!(!pending.is_complete());
        sender.complete();
        assert!(pending.is_complete());

        let (mut dropped, sender) = EventCompletion::pending();
        drop(sender);
        assert!(dropped.is_complete());
    }

    #[test]
    fn test_host_error_unwraps_single_aggregate() {
        let inner = HostError::component(ComponentId(3), anyhow::anyhow!("boom"));
        let wrapped = HostError::Aggregate(vec![HostError::Aggregate(vec![inner])]);
        match wrapped.unwrap_single() {
            HostError::Component { component_id, source } => {
                assert_eq!(component_id, ComponentId(3));
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("expected component error, got {other:?}"),
        }

        let two = HostError::Aggregate(vec![HostError::Detached, HostError::Detached]);
        assert!(matches!(two.unwrap_single(), HostError::Aggregate(v) if v.len() == 2));
    }

    #[test]
    fn test_dispatcher_tracks_lifecycle_work() {
        let mut pool = LocalPool::new();
        let pending = Rc::new(Cell::new(0));
        let handle = DispatcherHandle::new(pool.spawner(), Rc::clone(&pending));

        let (tx, rx) = futures::channel::oneshot::channel::<()>();
        handle
            .spawn_lifecycle(async move {
                let _ = rx.await;
            })
            .unwrap();
        handle.spawn(async {}).unwrap();
        assert_eq!(handle.pending_lifecycle(), 1);

        pool.run_until_stalled();
        assert_eq!(handle.pending_lifecycle(), 1);

        tx.send(()).unwrap();
        pool.run_until_stalled();
        assert_eq!(handle.pending_lifecycle(), 0);
    }

    #[test]
    fn test_batch_sink_delivers_in_order() {
        let (sink, mut rx) = BatchSink::channel();
        sink.submit(RenderBatch::new());
        sink.report(HostError::Detached);
        assert!(matches!(rx.try_next(), Ok(Some(HostMessage::Batch(_)))));
        assert!(matches!(rx.try_next(), Ok(Some(HostMessage::Exception(HostError::Detached)))));
    }
}
