//! `GET/WATCH /backupctl`: per pod-group, annotation + pods + per-container
//! backup identity. Super-only, app-scoped by subscription key. Grounded on
//! `endpoints/backupctl.go`.

use std::collections::{BTreeMap, HashMap};

use lainlet_core::decode::pod_group::PodGroup;
use lainlet_core::error::AuthError;
use serde::Serialize;

use crate::context::Context;
use crate::dispatcher::{Endpoint, Projected};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerForBackupctl {
    pub id: String,
    pub ip: String,
    pub node_ip: String,
    pub node_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PodInfoForBackupctl {
    pub annotation: String,
    pub instance_no: i32,
    pub containers: Vec<ContainerForBackupctl>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PodInfoList {
    pub pods: Vec<PodInfoForBackupctl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct BackupctlReply {
    pub data: BTreeMap<String, PodInfoList>,
}

pub struct BackupctlRequest {
    pub remote_addr: String,
    pub appname: Option<String>,
}

pub struct BackupctlEndpoint;

impl Endpoint for BackupctlEndpoint {
    type Request = BackupctlRequest;
    type Value = PodGroup;
    type Output = BackupctlReply;

    fn resolve_key(&self, request: &Self::Request, ctx: &Context) -> Result<String, AuthError> {
        if !ctx.auth.is_super(&request.remote_addr) {
            return Err(AuthError::SuperRequired);
        }
        Ok(crate::endpoints::filter_key(request.appname.as_deref()))
    }

    fn project(&self, _key: &str, data: HashMap<String, PodGroup>) -> Projected<Self::Output> {
        let mut out = BTreeMap::new();
        for pg in data.values() {
            let pods = pg
                .pods
                .iter()
                .map(|pod| PodInfoForBackupctl {
                    annotation: pg.spec.annotation.clone(),
                    instance_no: pod.instance_no,
                    containers: pod
                        .containers
                        .iter()
                        .map(|c| ContainerForBackupctl {
                            id: c.id.clone(),
                            ip: c.container_ip.clone(),
                            node_ip: c.node_ip.clone(),
                            node_name: c.node_name.clone(),
                        })
                        .collect(),
                })
                .collect();
            out.insert(pg.spec.name.clone(), PodInfoList { pods });
        }
        Projected::Ok(BackupctlReply { data: out })
    }
}
