use tessera_frames::{attribute_run, logical_children, Frame, RenderBatch, RenderTreeEdit};

/// Edits turning `old` into `new`, with inserted frames appended to `batch`'s
/// reference frames.
///
/// Children are compared by position. A child whose kind, tag name or
/// component id changed is removed and inserted again; trailing children are
/// removed or appended.
pub fn diff_frames(old: &[Frame], new: &[Frame], batch: &mut RenderBatch) -> Vec<RenderTreeEdit> {
    let mut edits = Vec::new();
    diff_children(old, 0..old.len(), new, 0..new.len(), batch, &mut edits);
    edits
}

fn diff_children(
    old: &[Frame],
    old_range: std::ops::Range<usize>,
    new: &[Frame],
    new_range: std::ops::Range<usize>,
    batch: &mut RenderBatch,
    edits: &mut Vec<RenderTreeEdit>,
) {
    let old_children = logical_children(old, old_range);
    let new_children = logical_children(new, new_range);
    let common = old_children.len().min(new_children.len());

    for k in 0..common {
        diff_child(k, old, old_children[k], new, new_children[k], batch, edits);
    }
    for _ in common..old_children.len() {
        edits.push(RenderTreeEdit::RemoveFrame { sibling_index: common });
    }
    for (k, &ni) in new_children.iter().enumerate().skip(common) {
        let reference_frame_index = batch.add_reference_frames(subtree(new, ni));
        edits.push(RenderTreeEdit::PrependFrame {
            sibling_index: k,
            reference_frame_index,
        });
    }
}

fn subtree(frames: &[Frame], index: usize) -> &[Frame] {
    &frames[index..index + frames[index].subtree_length()]
}

fn diff_child(
    k: usize,
    old: &[Frame],
    oi: usize,
    new: &[Frame],
    ni: usize,
    batch: &mut RenderBatch,
    edits: &mut Vec<RenderTreeEdit>,
) {
    match (&old[oi], &new[ni]) {
        (Frame::Text { content: a }, Frame::Text { content: b }) => {
            if a != b {
                let reference_frame_index = batch.add_reference_frames(subtree(new, ni));
                edits.push(RenderTreeEdit::UpdateText {
                    sibling_index: k,
                    reference_frame_index,
                });
            }
        }
        (Frame::Markup { content: a }, Frame::Markup { content: b }) => {
            if a != b {
                let reference_frame_index = batch.add_reference_frames(subtree(new, ni));
                edits.push(RenderTreeEdit::UpdateMarkup {
                    sibling_index: k,
                    reference_frame_index,
                });
            }
        }
        (Frame::Component { component_id: a, .. }, Frame::Component { component_id: b, .. })
            if a == b => {}
        (Frame::Element { name: a, .. }, Frame::Element { name: b, .. }) if a == b => {
            diff_attributes(k, old, oi, new, ni, batch, edits);

            let old_run = attribute_run(old, oi);
            let new_run = attribute_run(new, ni);
            let mut inner = Vec::new();
            diff_children(
                old,
                old_run.end..oi + old[oi].subtree_length(),
                new,
                new_run.end..ni + new[ni].subtree_length(),
                batch,
                &mut inner,
            );
            if !inner.is_empty() {
                edits.push(RenderTreeEdit::StepIn { sibling_index: k });
                edits.extend(inner);
                edits.push(RenderTreeEdit::StepOut);
            }
        }
        _ => {
            edits.push(RenderTreeEdit::RemoveFrame { sibling_index: k });
            let reference_frame_index = batch.add_reference_frames(subtree(new, ni));
            edits.push(RenderTreeEdit::PrependFrame {
                sibling_index: k,
                reference_frame_index,
            });
        }
    }
}

/// Attribute edits for the element at sibling `k`.
///
/// New attributes land at the end of an element's attribute list, so from the
/// first position where the runs differ every old attribute is removed and
/// every new one set again. That keeps the live order equal to frame order.
fn diff_attributes(
    k: usize,
    old: &[Frame],
    oi: usize,
    new: &[Frame],
    ni: usize,
    batch: &mut RenderBatch,
    edits: &mut Vec<RenderTreeEdit>,
) {
    let old_attrs: Vec<&Frame> = old[attribute_run(old, oi)]
        .iter()
        .filter(|f| matches!(f, Frame::Attribute { .. }))
        .collect();
    let new_attrs: Vec<&Frame> = new[attribute_run(new, ni)]
        .iter()
        .filter(|f| matches!(f, Frame::Attribute { .. }))
        .collect();

    let first_change = old_attrs
        .iter()
        .zip(&new_attrs)
        .position(|(o, n)| o != n)
        .unwrap_or_else(|| old_attrs.len().min(new_attrs.len()));

    for frame in &old_attrs[first_change..] {
        if let Frame::Attribute { name, .. } = frame {
            edits.push(RenderTreeEdit::RemoveAttribute {
                sibling_index: k,
                name: name.clone(),
            });
        }
    }
    for frame in &new_attrs[first_change..] {
        let reference_frame_index = batch.add_reference_frames(std::slice::from_ref(*frame));
        edits.push(RenderTreeEdit::SetAttribute {
            sibling_index: k,
            reference_frame_index,
        });
    }
}
