// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with turning selection criteria into predicates.

use thiserror::Error;

use crate::catalog::CatalogError;

#[derive(Error, Debug)]
pub enum SelectionError {
    #[error("Couldn't resolve '{name}' for the {criterion} criterion")]
    UnresolvedName {
        criterion: &'static str,
        name: String,
    },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
