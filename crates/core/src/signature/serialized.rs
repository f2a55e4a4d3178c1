use crate::descriptor::{DeclarationError, SignatureDesc};
use crate::device::BindingDevice;
use crate::layout::{ImmutableSamplerAttribs, ResourceAttribs};
use crate::platform::BindingPlatform;
use crate::signature::ResourceSignature;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Everything needed to recreate a signature, with the derived attribs kept to detect layout changes between the
/// build that wrote it and the one reading it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SerializedSignature {
	pub desc: SignatureDesc,
	pub attribs: Vec<ResourceAttribs>,
	pub immutable_samplers: Vec<ImmutableSamplerAttribs>,
}

impl<P: BindingPlatform> ResourceSignature<P> {
	pub fn serialize(&self) -> SerializedSignature {
		SerializedSignature {
			desc: self.desc().clone(),
			attribs: (0..self.resource_count()).map(|i| *self.attribs(i)).collect(),
			immutable_samplers: (0..self.immutable_sampler_count())
				.map(|i| *self.immutable_sampler(i).1)
				.collect(),
		}
	}

	/// Rebuild a signature from its serialized form, failing if the stored attribs don't match what building the
	/// description produces today.
	pub(crate) fn from_serialized(
		device: &BindingDevice<P>,
		serialized: SerializedSignature,
	) -> Result<Arc<Self>, DeclarationError> {
		let SerializedSignature {
			desc,
			attribs,
			immutable_samplers,
		} = serialized;
		let name = desc.name.clone();
		if attribs.len() != desc.resources.len() {
			return Err(DeclarationError::AttribsCountMismatch {
				signature: name,
				stored: attribs.len(),
				declared: desc.resources.len(),
			});
		}
		if immutable_samplers.len() != desc.immutable_samplers.len() {
			return Err(DeclarationError::AttribsCountMismatch {
				signature: name,
				stored: immutable_samplers.len(),
				declared: desc.immutable_samplers.len(),
			});
		}

		let signature = Self::new(device, desc)?;
		for (index, stored) in attribs.iter().enumerate() {
			if !signature.attribs(index as u32).is_compatible_with(stored) {
				return Err(DeclarationError::AttribsMismatch {
					signature: name,
					name: signature.resource(index as u32).name.clone(),
				});
			}
		}
		for (index, stored) in immutable_samplers.iter().enumerate() {
			let (desc, rebuilt) = signature.immutable_sampler(index as u32);
			if rebuilt != stored {
				return Err(DeclarationError::AttribsMismatch {
					signature: name,
					name: desc.name.clone(),
				});
			}
		}
		Ok(signature)
	}
}
