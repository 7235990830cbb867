use crate::MockAccessController;
use crate::MockMutationLog;
use crate::MockReplicaHost;
use crate::MockReplicationApp;
use crate::TypeConfig;

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct MockTypeConfig;

impl TypeConfig for MockTypeConfig {
    type APP = MockReplicationApp;

    type LOG = MockMutationLog;

    type AC = MockAccessController;

    type HOST = MockReplicaHost;
}
