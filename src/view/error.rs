// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with row views.

use thiserror::Error;

use crate::{catalog::CatalogError, selection::SelectionError, store::StoreError};

#[derive(Error, Debug)]
pub enum RowViewError {
    #[error("The row view's selection has changed (or its catalog was rebuilt) since it was last materialised; call materialize() first")]
    NotMaterialized,

    #[error("The row view's selection contains no data; there is nothing to average")]
    EmptySelection,

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
