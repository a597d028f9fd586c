use enumset::EnumSet;
use log::{debug, error, info, warn};

use crate::advertisement::AdvertisingParams;
use crate::error::StackStatus;
use crate::stack::StackRequest;

/// The two independent payload uploads that gate advertising.
#[derive(Debug, enumset::EnumSetType)]
pub enum PayloadKind {
  AdvertisingData,
  ScanResponse,
}

/// Tracks outstanding payload uploads and starts advertising once the last one completes.
#[derive(Debug)]
pub struct AdvertisingController {
  params: AdvertisingParams,
  pending: EnumSet<PayloadKind>,
}

impl AdvertisingController {
  pub fn new(params: AdvertisingParams) -> Self {
    Self {
      params,
      pending: EnumSet::new(),
    }
  }

  /// Mark one payload upload as outstanding.  Its completion is awaited even if it never gets
  /// submitted.
  pub fn arm(&mut self, kind: PayloadKind) {
    self.pending.insert(kind);
  }

  pub fn is_pending(&self, kind: PayloadKind) -> bool {
    self.pending.contains(kind)
  }

  /// Upload completion.  Advertising starts only when this call clears the last outstanding
  /// upload; a completion for an upload that is not outstanding never starts it again.
  pub fn on_config_uploaded(
    &mut self,
    kind: PayloadKind,
    status: StackStatus,
  ) -> Option<StackRequest> {
    if let Err(e) = status {
      error!("{kind:?} upload failed: {e}");
      return None;
    }
    if !self.pending.remove(kind) {
      warn!("Unexpected {kind:?} upload completion");
      return None;
    }
    if !self.pending.is_empty() {
      debug!("{kind:?} uploaded, waiting on {:?}", self.pending);
      return None;
    }
    Some(self.start_request())
  }

  /// Re-arm discoverability after a disconnect, independent of the upload gate.
  pub fn restart(&self) -> StackRequest {
    self.start_request()
  }

  pub fn on_advertise_start_result(&self, status: StackStatus) {
    match status {
      Ok(()) => info!("Advertising started"),
      Err(e) => error!("Advertising start failed: {e}"),
    }
  }

  pub fn on_advertise_stop_result(&self, status: StackStatus) {
    match status {
      Ok(()) => info!("Advertising stopped"),
      Err(e) => error!("Advertising stop failed: {e}"),
    }
  }

  fn start_request(&self) -> StackRequest {
    StackRequest::StartAdvertising {
      params: self.params.clone(),
    }
  }
}
