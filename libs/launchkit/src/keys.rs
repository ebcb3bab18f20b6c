//! Well-known launchd message and dictionary keys.

/// Request keys understood by the supervisor.
pub mod request {
    pub const SUBMIT_JOB: &str = "SubmitJob";
    pub const REMOVE_JOB: &str = "RemoveJob";
    pub const START_JOB: &str = "StartJob";
    pub const STOP_JOB: &str = "StopJob";
    pub const GET_JOB: &str = "GetJob";
    pub const GET_JOBS: &str = "GetJobs";
    /// Parameterless request returning the calling job's configuration.
    pub const CHECKIN: &str = "CheckIn";
}

/// Keys of a job dictionary, both in checkin responses and in plists.
pub mod job {
    pub const LABEL: &str = "Label";
    pub const DISABLED: &str = "Disabled";
    pub const USER_NAME: &str = "UserName";
    pub const GROUP_NAME: &str = "GroupName";
    pub const TIMEOUT: &str = "TimeOut";
    pub const EXIT_TIMEOUT: &str = "ExitTimeOut";
    pub const INIT_GROUPS: &str = "InitGroups";
    /// Socket-group table: logical name to descriptor list.
    pub const SOCKETS: &str = "Sockets";
    pub const MACH_SERVICES: &str = "MachServices";
    pub const INETD_COMPATIBILITY: &str = "inetdCompatibility";
    pub const ENABLE_GLOBBING: &str = "EnableGlobbing";
    pub const PROGRAM_ARGUMENTS: &str = "ProgramArguments";
    pub const PROGRAM: &str = "Program";
    pub const ON_DEMAND: &str = "OnDemand";
    pub const KEEP_ALIVE: &str = "KeepAlive";
    pub const RUN_AT_LOAD: &str = "RunAtLoad";
    pub const ROOT_DIRECTORY: &str = "RootDirectory";
    pub const WORKING_DIRECTORY: &str = "WorkingDirectory";
    pub const ENVIRONMENT_VARIABLES: &str = "EnvironmentVariables";
    pub const UMASK: &str = "Umask";
    pub const NICE: &str = "Nice";
    pub const STANDARD_IN_PATH: &str = "StandardInPath";
    pub const STANDARD_OUT_PATH: &str = "StandardOutPath";
    pub const STANDARD_ERROR_PATH: &str = "StandardErrorPath";
    pub const PID: &str = "PID";
    pub const LAST_EXIT_STATUS: &str = "LastExitStatus";
    pub const THROTTLE_INTERVAL: &str = "ThrottleInterval";
    pub const SERVICE_IPC: &str = "ServiceIPC";
}

/// Keys of a socket descriptor dictionary inside `Sockets`.
pub mod socket {
    pub const TYPE: &str = "SockType";
    pub const PASSIVE: &str = "SockPassive";
    pub const BONJOUR: &str = "Bonjour";
    pub const SECURE_WITH_KEY: &str = "SecureSocketWithKey";
    pub const PATH_NAME: &str = "SockPathName";
    pub const PATH_MODE: &str = "SockPathMode";
    pub const NODE_NAME: &str = "SockNodeName";
    pub const SERVICE_NAME: &str = "SockServiceName";
    pub const FAMILY: &str = "SockFamily";
    pub const PROTOCOL: &str = "SockProtocol";
    pub const MULTICAST_GROUP: &str = "MulticastGroup";
}
