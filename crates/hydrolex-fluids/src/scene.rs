use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use glam::{Mat4, Vec3};
use log::{info, warn};

use crate::{
    body::{BodyId, RigidBodies},
    error::SphError,
    lattice::{Aabb, Lattice, SpawnSink},
    particle::{BoundaryParticle, BoundarySnapshot, FluidParticle, FluidSnapshot, ParticleKind},
    sph::{self, SphParams, StepReport},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VolumeId(pub usize);

/// An oriented box that fills itself with particles once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Volume {
    /// Object-space bounds.
    pub bounds: Aabb,
    /// Object-to-world transform. May scale non-uniformly.
    pub transform: Mat4,
    pub template: ParticleKind,
    /// Whether the lattice has already been emitted.
    spawned: bool,
}

impl Volume {
    pub fn new(bounds: Aabb, transform: Mat4, template: ParticleKind) -> Self {
        Self {
            bounds,
            transform,
            template,
            spawned: false,
        }
    }

    #[inline(always)]
    pub fn is_spawned(&self) -> bool {
        self.spawned
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Spawn { template: ParticleKind, position: Vec3 },
    /// The volume has emitted its particles and should be deleted.
    RemoveVolume(VolumeId),
    /// The volume has emitted its particles but stays in the scene as geometry.
    DetachVolume(VolumeId),
}

/// Thread-safe queue of scene commands, played back with [`Scene::apply`].
#[derive(Debug, Default)]
pub struct CommandBuffer {
    commands: Mutex<Vec<Command>>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, command: Command) {
        self.commands.lock().unwrap_or_else(PoisonError::into_inner).push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_commands(self) -> Vec<Command> {
        self.commands.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SpawnSink for CommandBuffer {
    fn spawn(&self, template: ParticleKind, position: Vec3) {
        self.push(Command::Spawn { template, position });
    }
}

/// Output of [`Scene::spawn_volumes`].
#[derive(Debug, Default)]
pub struct SpawnBatch {
    pub commands: CommandBuffer,
    /// Volumes that emitted nothing, with the reason.
    pub failed: Vec<(VolumeId, SphError)>,
}

/// Output of [`Scene::spawn_pending`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpawnReport {
    /// Particles created.
    pub spawned: usize,
    pub failed: Vec<(VolumeId, SphError)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluidEntity {
    pub body: BodyId,
    pub particle: FluidParticle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryEntity {
    pub position: Vec3,
    pub particle: BoundaryParticle,
}

/// Fluid and boundary particles plus the volumes that spawn them.
///
/// Fluid particle transforms, masses and velocities live in the [`RigidBodies`] passed to each
/// call; the scene only keeps their body IDs.
pub struct Scene {
    params: SphParams,
    fluid: Vec<FluidEntity>,
    boundary: Vec<BoundaryEntity>,
    volumes: HashMap<usize, Volume>,
    /// The number of volumes ever added (used for IDs).
    n_volumes: usize,
}

impl Scene {
    #[inline(always)]
    pub fn new(params: SphParams) -> Self {
        Self {
            params,
            fluid: Vec::new(),
            boundary: Vec::new(),
            volumes: HashMap::new(),
            n_volumes: 0,
        }
    }

    #[inline(always)]
    pub fn params(&self) -> &SphParams {
        &self.params
    }

    #[inline(always)]
    pub fn fluid(&self) -> &[FluidEntity] {
        &self.fluid
    }

    #[inline(always)]
    pub fn boundary(&self) -> &[BoundaryEntity] {
        &self.boundary
    }

    pub fn volume(&self, id: VolumeId) -> Option<&Volume> {
        self.volumes.get(&id.0)
    }

    /// Adds a volume, returning its ID.
    pub fn add_volume(&mut self, volume: Volume) -> VolumeId {
        let i = self.n_volumes;
        self.n_volumes += 1;

        self.volumes.insert(i, volume);
        VolumeId(i)
    }

    /// Removes a volume from the scene. Particles it already spawned stay.
    pub fn remove_volume(&mut self, id: VolumeId) -> Option<Volume> {
        self.volumes.remove(&id.0)
    }

    /// Emits the lattice of one pending volume into `sink`, followed by the command that retires
    /// the volume. Returns the number of particles emitted.
    ///
    /// The volume is marked spawned as soon as it emits, so a second call before [`Scene::apply`]
    /// emits nothing. A volume with invalid geometry or template emits nothing and stays pending.
    pub fn spawn_volume(&mut self, id: VolumeId, sink: &CommandBuffer) -> Result<usize, SphError> {
        let batch_size = self.params.batch_size;
        let Some(volume) = self.volumes.get_mut(&id.0) else {
            return Ok(0);
        };

        if volume.spawned {
            return Ok(0);
        }

        volume.template.validate()?;
        let lattice = Lattice::new(volume.bounds, volume.transform, volume.template.radius())?;
        let n = lattice.emit(volume.template, sink, batch_size);
        volume.spawned = true;

        sink.push(if volume.template.is_fluid() {
            Command::RemoveVolume(id)
        } else {
            Command::DetachVolume(id)
        });

        info!("volume {} emitted {n} particles", id.0);
        Ok(n)
    }

    /// Emits every pending volume into a fresh command buffer.
    ///
    /// Volumes are independent: one that fails is reported in [`SpawnBatch::failed`] and the rest
    /// still emit.
    pub fn spawn_volumes(&mut self) -> SpawnBatch {
        let commands = CommandBuffer::new();

        let mut ids: Vec<usize> = self.volumes.iter()
            .filter(|(_, v)| !v.spawned)
            .map(|(&i, _)| i)
            .collect();
        ids.sort_unstable();

        let mut failed = Vec::new();
        for i in ids {
            if let Err(e) = self.spawn_volume(VolumeId(i), &commands) {
                warn!("volume {i} not spawned: {e}");
                failed.push((VolumeId(i), e));
            }
        }

        SpawnBatch { commands, failed }
    }

    /// Plays back commands, creating a rigid body for every spawned fluid particle.
    pub fn apply<B: RigidBodies>(&mut self, commands: Vec<Command>, bodies: &mut B) -> Result<(), SphError> {
        for command in commands {
            match command {
                Command::Spawn { template, position } => {
                    self.insert_particle(template, position, bodies)?;
                }
                Command::RemoveVolume(id) => {
                    self.remove_volume(id);
                    info!("volume {} consumed", id.0);
                }
                Command::DetachVolume(id) => {
                    if let Some(volume) = self.volumes.get_mut(&id.0) {
                        volume.spawned = true;
                    }
                }
            }
        }

        Ok(())
    }

    /// Spawns every pending volume and plays the result back immediately.
    pub fn spawn_pending<B: RigidBodies>(&mut self, bodies: &mut B) -> Result<SpawnReport, SphError> {
        let SpawnBatch { commands, failed } = self.spawn_volumes();
        let commands = commands.into_commands();
        let spawned = commands.iter().filter(|c| matches!(c, Command::Spawn { .. })).count();

        self.apply(commands, bodies)?;
        Ok(SpawnReport { spawned, failed })
    }

    pub fn insert_particle<B: RigidBodies>(
        &mut self,
        template: ParticleKind,
        position: Vec3,
        bodies: &mut B,
    ) -> Result<(), SphError> {
        template.validate()?;

        match template {
            ParticleKind::Fluid { particle, mass } => {
                let body = bodies.create(position, mass);
                self.fluid.push(FluidEntity { body, particle });
            }
            ParticleKind::Boundary(particle) => {
                self.boundary.push(BoundaryEntity { position, particle });
            }
        }

        Ok(())
    }

    /// Destroys every fluid and boundary particle. Volumes are kept.
    pub fn clear<B: RigidBodies>(&mut self, bodies: &mut B) {
        for entity in self.fluid.drain(..) {
            bodies.remove(entity.body);
        }

        self.boundary.clear();
    }

    pub fn fluid_snapshot<B: RigidBodies>(&self, bodies: &B) -> FluidSnapshot {
        let mut snapshot = FluidSnapshot::with_capacity(self.fluid.len());

        for entity in self.fluid.iter() {
            snapshot.push(
                entity.body,
                bodies.position(entity.body),
                entity.particle,
                bodies.mass(entity.body),
                bodies.velocity(entity.body),
            );
        }

        snapshot
    }

    pub fn boundary_snapshot(&self) -> BoundarySnapshot {
        let mut snapshot = BoundarySnapshot::default();

        for entity in self.boundary.iter() {
            snapshot.push(entity.position, entity.particle);
        }

        snapshot
    }

    /// Runs one SPH step over the current particles.
    pub fn step<B: RigidBodies>(&mut self, dt: f32, bodies: &mut B) -> StepReport {
        let fluid = self.fluid_snapshot(bodies);
        let boundary = self.boundary_snapshot();

        sph::step(&fluid, &boundary, bodies, dt, &self.params)
    }
}

#[cfg(test)]
mod tests {
    use crate::{body::BodyStore, error::GeometryError};

    use super::*;

    fn fluid_template() -> ParticleKind {
        ParticleKind::Fluid {
            particle: FluidParticle { radius: 0.5, ..Default::default() },
            mass: 1.0,
        }
    }

    fn boundary_template() -> ParticleKind {
        ParticleKind::Boundary(BoundaryParticle { radius: 0.5, mass: 1.0, rest_density: 1000.0 })
    }

    #[test]
    fn fluid_volume_is_consumed() {
        let mut scene = Scene::new(SphParams::default());
        let mut bodies = BodyStore::new();
        let id = scene.add_volume(Volume::new(Aabb::new(Vec3::ZERO, Vec3::splat(2.0)), Mat4::IDENTITY, fluid_template()));

        assert_eq!(scene.spawn_pending(&mut bodies).unwrap().spawned, 8);
        assert_eq!(scene.fluid().len(), 8);
        assert_eq!(bodies.len(), 8);
        assert!(scene.volume(id).is_none());

        assert_eq!(scene.spawn_pending(&mut bodies).unwrap().spawned, 0);
        assert_eq!(scene.fluid().len(), 8);
    }

    #[test]
    fn boundary_volume_is_detached_once() {
        let mut scene = Scene::new(SphParams::default());
        let mut bodies = BodyStore::new();
        let id = scene.add_volume(Volume::new(Aabb::new(Vec3::ZERO, Vec3::new(3.0, 1.0, 1.0)), Mat4::IDENTITY, boundary_template()));

        assert_eq!(scene.spawn_pending(&mut bodies).unwrap().spawned, 3);
        assert_eq!(scene.boundary().len(), 3);
        assert!(bodies.is_empty());
        assert!(scene.volume(id).is_some_and(Volume::is_spawned));

        assert_eq!(scene.spawn_pending(&mut bodies).unwrap().spawned, 0);
        assert_eq!(scene.boundary().len(), 3);
    }

    #[test]
    fn invalid_volume_spawns_nothing() {
        let mut scene = Scene::new(SphParams::default());
        let mut bodies = BodyStore::new();
        let flat = Mat4::from_scale(Vec3::new(1.0, 1.0, 0.0));
        let id = scene.add_volume(Volume::new(Aabb::new(Vec3::ZERO, Vec3::ONE), flat, fluid_template()));

        let report = scene.spawn_pending(&mut bodies).unwrap();
        assert_eq!(report.spawned, 0);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, id);
        assert!(matches!(report.failed[0].1, SphError::InvalidGeometry(GeometryError::Scale(_))));
        assert!(scene.fluid().is_empty());
        assert!(scene.volume(id).is_some_and(|v| !v.is_spawned()));
    }

    #[test]
    fn invalid_volume_does_not_block_others() {
        let mut scene = Scene::new(SphParams::default());
        let mut bodies = BodyStore::new();
        let cube = Aabb::new(Vec3::ZERO, Vec3::splat(2.0));
        let flat = Mat4::from_scale(Vec3::new(1.0, 1.0, 0.0));

        let first = scene.add_volume(Volume::new(cube, Mat4::IDENTITY, fluid_template()));
        let bad = scene.add_volume(Volume::new(cube, flat, fluid_template()));
        let last = scene.add_volume(Volume::new(cube, Mat4::from_translation(Vec3::splat(5.0)), boundary_template()));

        for _ in 0..3 {
            let report = scene.spawn_pending(&mut bodies).unwrap();
            assert_eq!(report.failed.len(), 1);
            assert_eq!(report.failed[0].0, bad);
        }

        assert_eq!(scene.fluid().len(), 8);
        assert_eq!(scene.boundary().len(), 8);
        assert!(scene.volume(first).is_none());
        assert!(scene.volume(last).is_some_and(Volume::is_spawned));
        assert!(scene.volume(bad).is_some_and(|v| !v.is_spawned()));
    }

    #[test]
    fn volume_emits_once_before_playback() {
        let mut scene = Scene::new(SphParams::default());
        let mut bodies = BodyStore::new();
        scene.add_volume(Volume::new(Aabb::new(Vec3::ZERO, Vec3::splat(2.0)), Mat4::IDENTITY, fluid_template()));

        let first = scene.spawn_volumes();
        let second = scene.spawn_volumes();
        assert_eq!(first.commands.len(), 8 + 1);
        assert!(second.commands.is_empty());

        scene.apply(first.commands.into_commands(), &mut bodies).unwrap();
        scene.apply(second.commands.into_commands(), &mut bodies).unwrap();
        assert_eq!(scene.fluid().len(), 8);
    }

    #[test]
    fn clear_destroys_particles_and_bodies() {
        let mut scene = Scene::new(SphParams::default());
        let mut bodies = BodyStore::new();
        scene.insert_particle(fluid_template(), Vec3::ZERO, &mut bodies).unwrap();
        scene.insert_particle(boundary_template(), Vec3::ONE, &mut bodies).unwrap();

        scene.clear(&mut bodies);
        assert!(scene.fluid().is_empty());
        assert!(scene.boundary().is_empty());
        assert!(bodies.is_empty());
    }

    #[test]
    fn empty_scene_steps_without_work() {
        let mut scene = Scene::new(SphParams::default());
        let mut bodies = BodyStore::new();
        scene.insert_particle(boundary_template(), Vec3::ONE, &mut bodies).unwrap();

        let report = scene.step(1.0 / 60.0, &mut bodies);
        assert_eq!(report.n_fluid, 0);
        assert_eq!(report.n_boundary, 1);
        assert!(report.diagnostics.is_empty());
    }
}
