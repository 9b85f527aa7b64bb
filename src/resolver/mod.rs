// dkim-validator – validation of DKIM signatures
// Copyright © 2022–2023 David Bürgin <dbuergin@gluet.ch>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later
// version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.

//! Retrieval of TXT records.

#[cfg(feature = "hickory-resolver")]
mod hickory_resolver;

use std::{
    collections::HashMap,
    future::{self, Future, Ready},
    io::{self, ErrorKind},
    pin::Pin,
    sync::Arc,
    time::Duration,
};
use tokio::time;

/// A trait for entities that can look up TXT records in DNS.
///
/// This trait is the seam between validation and the network. An
/// implementation for the Hickory DNS resolver is available with feature
/// `hickory-resolver`; the implementation for `HashMap` serves fixed answers.
pub trait Resolver: Send + Sync {
    /// The future resolving to the text of the TXT records found.
    type Query<'a>: Future<Output = io::Result<Vec<String>>> + Send + 'a
    where
        Self: 'a;

    /// Looks up the TXT records at the given name.
    ///
    /// The name is passed in ASCII form, for example
    /// `selector._domainkey.example.com`, without trailing dot. Each TXT
    /// record’s character strings are concatenated into one string.
    ///
    /// A name without records may resolve to either an empty list, or to an
    /// error of kind [`ErrorKind::NotFound`].
    fn get_text_records(&self, name: &str) -> Self::Query<'_>;
}

impl<R: Resolver + ?Sized> Resolver for Arc<R> {
    type Query<'a> = R::Query<'a> where Self: 'a;

    fn get_text_records(&self, name: &str) -> Self::Query<'_> {
        (**self).get_text_records(name)
    }
}

impl<R: Resolver + ?Sized> Resolver for &R {
    type Query<'a> = R::Query<'a> where Self: 'a;

    fn get_text_records(&self, name: &str) -> Self::Query<'_> {
        (**self).get_text_records(name)
    }
}

/// Fixed answers, keyed by name. Names are matched case-insensitively.
impl Resolver for HashMap<String, Vec<String>> {
    type Query<'a> = Ready<io::Result<Vec<String>>>;

    fn get_text_records(&self, name: &str) -> Self::Query<'_> {
        let records = self
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, records)| records.clone())
            .ok_or_else(|| io::Error::from(ErrorKind::NotFound));

        future::ready(records)
    }
}

/// A resolver that gives up on lookups taking longer than a time limit.
///
/// A lookup that runs out of time fails with an error of kind
/// [`ErrorKind::TimedOut`].
#[derive(Clone, Debug)]
pub struct Timeout<R> {
    inner: R,
    duration: Duration,
}

impl<R> Timeout<R> {
    pub fn new(inner: R, duration: Duration) -> Self {
        Self { inner, duration }
    }
}

impl<R: Resolver> Resolver for Timeout<R> {
    type Query<'a> = Pin<Box<dyn Future<Output = io::Result<Vec<String>>> + Send + 'a>>
    where
        Self: 'a;

    fn get_text_records(&self, name: &str) -> Self::Query<'_> {
        let query = self.inner.get_text_records(name);
        let duration = self.duration;

        Box::pin(async move {
            match time::timeout(duration, query).await {
                Ok(result) => result,
                Err(_) => Err(ErrorKind::TimedOut.into()),
            }
        })
    }
}
