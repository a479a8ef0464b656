#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use futures::channel::{mpsc, oneshot};
    use futures::executor::LocalPool;
    use futures::FutureExt;
    use pretty_assertions::assert_eq;
    use tessera_frames::*;

    use crate::*;

    struct Counter {
        count: Rc<Cell<u32>>,
    }

    impl Component for Counter {
        fn render(&self, b: &mut RenderBuilder) {
            let count = Rc::clone(&self.count);
            b.element("p", |b| {
                b.text(format!("Current count: {}", self.count.get()));
            });
            b.element("button", |b| {
                b.on("onclick", move |_| {
                    count.set(count.get() + 1);
                    Ok(())
                });
                b.text("Click me");
            });
        }
    }

    struct Harness {
        pool: LocalPool,
        host: TestHost,
        receiver: mpsc::UnboundedReceiver<HostMessage>,
    }

    impl Harness {
        fn new() -> Self {
            let pool = LocalPool::new();
            let (sink, receiver) = BatchSink::channel();
            let dispatcher = DispatcherHandle::new(pool.spawner(), Rc::new(Cell::new(0)));
            let mut host = TestHost::new();
            host.attach(HostContext { sink, dispatcher });
            Harness { pool, host, receiver }
        }

        fn messages(&mut self) -> Vec<HostMessage> {
            self.pool.run_until_stalled();
            let mut out = Vec::new();
            while let Ok(Some(message)) = self.receiver.try_next() {
                out.push(message);
            }
            out
        }

        fn batches(&mut self) -> Vec<RenderBatch> {
            self.messages()
                .into_iter()
                .filter_map(|m| match m {
                    HostMessage::Batch(b) => Some(b),
                    HostMessage::Exception(_) => None,
                })
                .collect()
        }
    }

    fn handler_ids(frames: &[Frame]) -> Vec<EventHandlerId> {
        frames
            .iter()
            .filter_map(|f| match f {
                Frame::Attribute { event_handler_id, .. } => *event_handler_id,
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_builder_subtree_lengths() {
        let mut b = RenderBuilder::new();
        b.element("div", |b| {
            b.attribute("class", "box");
            b.element("span", |b| {
                b.text("x");
            });
            b.region(|b| {
                b.text("y");
            });
        });
        let built = b.finish();
        assert_eq!(
            built.frames,
            vec![
                Frame::element("div", 6),
                Frame::attribute("class", "box"),
                Frame::element("span", 2),
                Frame::text("x"),
                Frame::Region { subtree_length: 2 },
                Frame::text("y"),
            ]
        );
        assert_eq!(validate_frames(&built.frames), Ok(()));
    }

    #[test]
    fn test_builder_closes_open_elements() {
        let mut b = RenderBuilder::new();
        b.open_element("ul").open_element("li").text("a");
        let built = b.finish();
        assert_eq!(built.frames[0].subtree_length(), 3);
        assert_eq!(built.frames[1].subtree_length(), 2);
    }

    #[test]
    fn test_diff_first_render_prepends_everything() {
        let new = vec![Frame::element("p", 2), Frame::text("a"), Frame::text("b")];
        let mut batch = RenderBatch::new();
        let edits = diff_frames(&[], &new, &mut batch);
        assert_eq!(
            edits,
            vec![
                RenderTreeEdit::PrependFrame { sibling_index: 0, reference_frame_index: 0 },
                RenderTreeEdit::PrependFrame { sibling_index: 1, reference_frame_index: 2 },
            ]
        );
        assert_eq!(batch.reference_frames.len(), 3);
    }

    #[test]
    fn test_diff_text_update_inside_element() {
        let old = vec![Frame::element("p", 2), Frame::text("Current count: 0")];
        let new = vec![Frame::element("p", 2), Frame::text("Current count: 1")];
        let mut batch = RenderBatch::new();
        let edits = diff_frames(&old, &new, &mut batch);
        assert_eq!(
            edits,
            vec![
                RenderTreeEdit::StepIn { sibling_index: 0 },
                RenderTreeEdit::UpdateText { sibling_index: 0, reference_frame_index: 0 },
                RenderTreeEdit::StepOut,
            ]
        );
        assert_eq!(batch.reference_frames, vec![Frame::text("Current count: 1")]);
    }

    #[test]
    fn test_diff_attributes() {
        let old = vec![
            Frame::element("input", 3),
            Frame::attribute("value", "a"),
            Frame::attribute("disabled", true),
        ];
        let new = vec![
            Frame::element("input", 3),
            Frame::attribute("value", "b"),
            Frame::attribute("placeholder", "p"),
        ];
        let mut batch = RenderBatch::new();
        let edits = diff_frames(&old, &new, &mut batch);
        assert_eq!(
            edits,
            vec![
                RenderTreeEdit::RemoveAttribute { sibling_index: 0, name: "value".into() },
                RenderTreeEdit::RemoveAttribute { sibling_index: 0, name: "disabled".into() },
                RenderTreeEdit::SetAttribute { sibling_index: 0, reference_frame_index: 0 },
                RenderTreeEdit::SetAttribute { sibling_index: 0, reference_frame_index: 1 },
            ]
        );
    }

    #[test]
    fn test_diff_unchanged_attribute_prefix_is_kept() {
        let old = vec![
            Frame::element("a", 3),
            Frame::attribute("href", "/"),
            Frame::attribute("class", "x"),
        ];
        let new = vec![
            Frame::element("a", 4),
            Frame::attribute("href", "/"),
            Frame::attribute("class", "x"),
            Frame::attribute("title", "t"),
        ];
        let mut batch = RenderBatch::new();
        let edits = diff_frames(&old, &new, &mut batch);
        assert_eq!(
            edits,
            vec![RenderTreeEdit::SetAttribute { sibling_index: 0, reference_frame_index: 0 }]
        );
        assert_eq!(batch.reference_frames, vec![Frame::attribute("title", "t")]);
    }

    #[test]
    fn test_diff_replaces_changed_kind_and_trims_tail() {
        let old = vec![Frame::text("Loading..."), Frame::text("extra")];
        let new = vec![Frame::element("table", 1)];
        let mut batch = RenderBatch::new();
        let edits = diff_frames(&old, &new, &mut batch);
        assert_eq!(
            edits,
            vec![
                RenderTreeEdit::RemoveFrame { sibling_index: 0 },
                RenderTreeEdit::PrependFrame { sibling_index: 0, reference_frame_index: 0 },
                RenderTreeEdit::RemoveFrame { sibling_index: 1 },
            ]
        );
    }

    #[test]
    fn test_diff_regions_are_flattened() {
        let old = vec![Frame::Region { subtree_length: 2 }, Frame::text("a"), Frame::text("b")];
        let new = vec![Frame::text("a"), Frame::Region { subtree_length: 2 }, Frame::text("c")];
        let mut batch = RenderBatch::new();
        let edits = diff_frames(&old, &new, &mut batch);
        assert_eq!(
            edits,
            vec![RenderTreeEdit::UpdateText { sibling_index: 1, reference_frame_index: 0 }]
        );
    }

    #[test]
    fn test_render_root_submits_batch() {
        let mut h = Harness::new();
        let root = h.host.add_root(Box::new(Counter { count: Rc::new(Cell::new(0)) }));
        h.host.render_root(root).unwrap();
        let batches = h.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].updated_components[0].component_id, root);
        assert_eq!(batches[0].updated_components[0].edits.len(), 2);

        let frames = h.host.frames(root).unwrap();
        assert_eq!(handler_ids(&frames), vec![EventHandlerId(1)]);
        assert_eq!(validate_frames(&frames), Ok(()));
    }

    #[test]
    fn test_render_unknown_root() {
        let mut h = Harness::new();
        assert!(matches!(
            h.host.render_root(ComponentId(42)),
            Err(HostError::UnknownComponent(ComponentId(42)))
        ));
    }

    #[test]
    fn test_detached_host() {
        let mut host = TestHost::new();
        let root = host.add_root(Box::new(FnComponent(|b: &mut RenderBuilder| {
            b.text("x");
        })));
        assert!(matches!(host.render_root(root), Err(HostError::Detached)));
    }

    #[test]
    fn test_event_rerenders_and_replaces_handler_ids() {
        let mut h = Harness::new();
        let count = Rc::new(Cell::new(0));
        let root = h.host.add_root(Box::new(Counter { count: Rc::clone(&count) }));
        h.host.render_root(root).unwrap();
        h.batches();

        let mut completion = h
            .host
            .dispatch_event(EventHandlerId(1), None, EventArgs::click())
            .unwrap();
        assert!(completion.is_complete());
        assert_eq!(count.get(), 1);

        let batches = h.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].disposed_event_handler_ids, vec![EventHandlerId(1)]);
        assert!(batches[0]
            .reference_frames
            .contains(&Frame::text("Current count: 1")));
        assert_eq!(handler_ids(&h.host.frames(root).unwrap()), vec![EventHandlerId(2)]);

        assert!(matches!(
            h.host.dispatch_event(EventHandlerId(1), None, EventArgs::click()),
            Err(HostError::UnknownHandler(EventHandlerId(1)))
        ));
    }

    #[test]
    fn test_handler_error_is_reported() {
        let mut h = Harness::new();
        let root = h.host.add_root(Box::new(FnComponent(|b: &mut RenderBuilder| {
            b.element("button", |b| {
                b.on("onclick", |_| Err(anyhow::anyhow!("boom")));
            });
        })));
        h.host.render_root(root).unwrap();
        h.messages();

        h.host
            .dispatch_event(EventHandlerId(1), None, EventArgs::click())
            .unwrap();
        let messages = h.messages();
        let error = messages
            .into_iter()
            .find_map(|m| match m {
                HostMessage::Exception(e) => Some(e),
                HostMessage::Batch(_) => None,
            })
            .unwrap();
        assert_eq!(error.component_error().unwrap().to_string(), "boom");
    }

    struct Loader {
        data: Rc<RefCell<Option<Vec<String>>>>,
        source: Option<oneshot::Receiver<Vec<String>>>,
    }

    impl Component for Loader {
        fn init(&mut self, _ctx: &ComponentContext) -> Option<LifecycleFuture> {
            let receiver = self.source.take()?;
            let data = Rc::clone(&self.data);
            Some(
                async move {
                    let rows = receiver.await?;
                    *data.borrow_mut() = Some(rows);
                    Ok::<(), anyhow::Error>(())
                }
                .boxed_local(),
            )
        }

        fn render(&self, b: &mut RenderBuilder) {
            match &*self.data.borrow() {
                None => {
                    b.element("p", |b| {
                        b.text("Loading...");
                    });
                }
                Some(rows) => {
                    b.element("table", |b| {
                        for row in rows {
                            b.element("tr", |b| {
                                b.element("td", |b| {
                                    b.text(row.clone());
                                });
                            });
                        }
                    });
                }
            }
        }
    }

    #[test]
    fn test_async_init_rerenders_on_completion() {
        let mut h = Harness::new();
        let pending = Rc::new(Cell::new(0));
        let dispatcher = DispatcherHandle::new(h.pool.spawner(), Rc::clone(&pending));
        let (sink, receiver) = BatchSink::channel();
        h.host.attach(HostContext { sink, dispatcher });
        h.receiver = receiver;

        let (sender, source) = oneshot::channel();
        let root = h.host.add_root(Box::new(Loader {
            data: Rc::new(RefCell::new(None)),
            source: Some(source),
        }));
        h.host.render_root(root).unwrap();
        let first = h.batches();
        assert_eq!(first.len(), 1);
        assert!(first[0].reference_frames.contains(&Frame::text("Loading...")));
        assert_eq!(pending.get(), 1);

        sender.send(vec!["a".into(), "b".into()]).unwrap();
        let second = h.batches();
        assert_eq!(second.len(), 1);
        assert_eq!(
            second[0].updated_components[0].edits[0],
            RenderTreeEdit::RemoveFrame { sibling_index: 0 }
        );
        assert_eq!(pending.get(), 0);
    }

    #[test]
    fn test_async_handler_completion() {
        let mut h = Harness::new();
        let (sender, receiver) = oneshot::channel::<()>();
        let receiver = Rc::new(RefCell::new(Some(receiver)));
        let done = Rc::new(Cell::new(false));
        let flag = Rc::clone(&done);
        let root = h.host.add_root(Box::new(FnComponent(move |b: &mut RenderBuilder| {
            let receiver = Rc::clone(&receiver);
            let flag = Rc::clone(&flag);
            b.element("button", |b| {
                b.on_async("onclick", move |_| {
                    let receiver = receiver.borrow_mut().take();
                    let flag = Rc::clone(&flag);
                    async move {
                        if let Some(rx) = receiver {
                            rx.await?;
                        }
                        flag.set(true);
                        Ok::<(), anyhow::Error>(())
                    }
                    .boxed_local()
                });
            });
        })));
        h.host.render_root(root).unwrap();
        h.batches();

        let mut completion = h
            .host
            .dispatch_event(EventHandlerId(1), None, EventArgs::click())
            .unwrap();
        h.pool.run_until_stalled();
        assert!(!completion.is_complete());

        sender.send(()).unwrap();
        h.pool.run_until_stalled();
        assert!(completion.is_complete());
        assert!(done.get());
    }

    struct Toggle {
        show: Rc<Cell<bool>>,
    }

    impl Component for Toggle {
        fn render(&self, b: &mut RenderBuilder) {
            if self.show.get() {
                b.component(Counter { count: Rc::new(Cell::new(0)) });
            }
            b.element("span", |b| {
                b.text("end");
            });
        }
    }

    #[test]
    fn test_child_components_reused_and_disposed() {
        let mut h = Harness::new();
        let show = Rc::new(Cell::new(true));
        let root = h.host.add_root(Box::new(Toggle { show: Rc::clone(&show) }));
        h.host.render_root(root).unwrap();
        let batches = h.batches();
        assert_eq!(batches.len(), 1);
        let order: Vec<_> = batches[0]
            .updated_components
            .iter()
            .map(|d| d.component_id)
            .collect();
        let children = h.host.children_of(root);
        assert_eq!(children.len(), 1);
        assert_eq!(order, vec![root, children[0]]);

        h.host.state_has_changed(root);
        h.batches();
        assert_eq!(h.host.children_of(root), children);

        show.set(false);
        h.host.state_has_changed(root);
        let batches = h.batches();
        assert_eq!(batches[0].disposed_component_ids, vec![children[0]]);
        assert_eq!(h.host.component_ids(), vec![root]);
        assert_eq!(h.host.live_handler_count(), 0);
    }
}
