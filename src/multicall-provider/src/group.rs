use crate::block::BlockNumber;
use crate::interceptor::CallRequest;

/// A contiguous run of calls of a batch sharing the same block context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Group<'a> {
    pub block: BlockNumber,
    pub calls: &'a [CallRequest],
}

impl Group<'_> {
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

/// Splits the batch into groups of consecutive calls with the same block context.
///
/// The groups keep the order of the calls: calls on the same block that are separated
/// by a call on another block end up in different groups.
pub fn group_by_block(calls: &[CallRequest]) -> Vec<Group<'_>> {
    let mut groups = Vec::new();
    let mut start = 0;

    for index in 1..=calls.len() {
        if index == calls.len() || calls[index].block != calls[start].block {
            groups.push(Group {
                block: calls[start].block,
                calls: &calls[start..index],
            });
            start = index;
        }
    }

    groups
}
