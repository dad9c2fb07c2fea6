pub const APP_NAME: &str = "hdtapps";

/// Name of the specification document at the root of every application package.
pub const SPEC_FILENAME: &str = "app-spec.json";

/// Name of the provenance archive written next to a published package.
pub const PROVENANCE_ARCHIVE: &str = "prov-pkg.tar.gz";

/// Token that opens a container-relative path template.
pub const APP_ROOT_TOKEN: &str = "{r}";

/// Directory inside the container that `{r}` expands to.
pub const CONTAINER_APP_ROOT: &str = "/app";

/// Prefix of every alias token in an invocation command.
pub const ALIAS_SIGIL: char = '$';

/// Workspace subfolder that receives the outputs copied out of a container.
pub const OUTPUT_DIR: &str = "output";

/// Container id reported once the container has been torn down.
pub const REMOVED_CONTAINER: &str = "REMOVED";

pub const DEFAULT_IMAGE_PREFIX: &str = "hdtapps/";
pub const DEFAULT_PROVIDER_QNAME: &str = "default";
