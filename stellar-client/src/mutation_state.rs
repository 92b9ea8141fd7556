//! Mutation state for read-your-own-writes queries

use crate::result::{MutateInResult, MutationResult, MutationToken};
use std::collections::BTreeMap;
use stellar_proto as proto;

/// Latest known mutation per (bucket, partition)
///
/// Handed to a query through `consistent_with` so the index catches up to
/// these mutations before the scan runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationState {
    tokens: BTreeMap<(String, u16), MutationToken>,
}

impl MutationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a token, keeping the highest sequence number per partition
    pub fn add_token(&mut self, token: MutationToken) {
        let key = (token.bucket_name.clone(), token.partition_id);
        match self.tokens.get(&key) {
            Some(existing) if existing.sequence_number >= token.sequence_number => {}
            _ => {
                self.tokens.insert(key, token);
            }
        }
    }

    /// Record the token of a mutation result, if it carried one
    pub fn add_result(&mut self, result: &MutationResult) {
        if let Some(token) = result.mutation_token() {
            self.add_token(token.clone());
        }
    }

    pub fn add_mutate_in_result(&mut self, result: &MutateInResult) {
        if let Some(token) = result.mutation_token() {
            self.add_token(token.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &MutationToken> {
        self.tokens.values()
    }

    pub(crate) fn to_wire(&self) -> Vec<proto::MutationToken> {
        self.tokens.values().map(MutationToken::to_wire).collect()
    }
}

impl FromIterator<MutationToken> for MutationState {
    fn from_iter<I: IntoIterator<Item = MutationToken>>(iter: I) -> Self {
        let mut state = MutationState::new();
        for token in iter {
            state.add_token(token);
        }
        state
    }
}
