//! Event definitions.

pub mod allocation {
    use serde::Serialize;

    use crate::core::vm::VmSpec;

    #[derive(Clone, Serialize)]
    pub struct VmCreateRequest {
        pub vm: VmSpec,
    }

    #[derive(Clone, Serialize)]
    pub struct VmCreateAck {
        pub vm_id: u32,
        pub host_id: Option<u32>,
        pub success: bool,
    }

    #[derive(Clone, Serialize)]
    pub struct VmDestroyRequest {
        pub vm_id: u32,
    }

    #[derive(Clone, Serialize)]
    pub struct VmDestroyAck {
        pub vm_id: u32,
    }
}

pub mod cloudlet {
    use serde::Serialize;

    use crate::core::cloudlet::Cloudlet;

    #[derive(Serialize)]
    pub struct CloudletSubmit {
        pub cloudlet: Cloudlet,
        pub vm_id: u32,
    }

    #[derive(Serialize)]
    pub struct CloudletReturn {
        pub cloudlet: Cloudlet,
    }

    /// Self-message of the datacenter triggering a processing update.
    #[derive(Clone, Serialize)]
    pub struct UpdateProcessing {}
}
