//! Prints the ManagedServiceAccount CRD as YAML.

use anyhow::Result;
use kube::CustomResourceExt;
use managed_serviceaccount_agent::ManagedServiceAccount;

fn main() -> Result<()> {
    print!("{}", serde_yaml::to_string(&ManagedServiceAccount::crd())?);
    Ok(())
}
