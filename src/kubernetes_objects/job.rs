use k8s_openapi::api::batch::v1::Job;

/// Snapshot of the counters that decide whether a Job still holds a worker slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedJob {
    pub name: String,
    pub completions: Option<i32>,
    pub succeeded: Option<i32>,
}

impl ObservedJob {
    /// A job stops occupying a slot once `succeeded >= completions`.
    ///
    /// Unknown completions count as active until the cluster says otherwise.
    pub fn occupies_slot(&self) -> bool {
        match self.completions {
            Some(completions) => self.succeeded.unwrap_or(0) < completions,
            None => true,
        }
    }
}

impl From<&Job> for ObservedJob {
    fn from(job: &Job) -> Self {
        ObservedJob {
            name: job.metadata.name.clone().unwrap_or_default(),
            completions: job.spec.as_ref().and_then(|spec| spec.completions),
            succeeded: job.status.as_ref().and_then(|status| status.succeeded),
        }
    }
}
